use async_trait::async_trait;
use chrono::Utc;
use mailer_domain::{entities::Recipient, repositories::RecipientStore};
use mailer_errors::{MailerError, MailerResult};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, instrument};

/// 基于 `emails` 表的收件人存储
pub struct SqliteRecipientStore {
    pool: SqlitePool,
}

impl SqliteRecipientStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_recipient(row: &sqlx::sqlite::SqliteRow) -> MailerResult<Recipient> {
        Ok(Recipient {
            id: row.try_get("id")?,
            address: row.try_get("email")?,
            display_name: row.try_get("name")?,
        })
    }

    /// 写入收件人，地址重复时忽略，返回实际新增的条数
    pub async fn insert_many(&self, recipients: &[(String, String)]) -> MailerResult<u64> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let mut inserted = 0;

        for (address, name) in recipients {
            let result =
                sqlx::query("INSERT OR IGNORE INTO emails (email, name, created_at) VALUES ($1, $2, $3)")
                    .bind(address)
                    .bind(name)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        info!("写入收件人 {} 条（提交 {} 条）", inserted, recipients.len());
        Ok(inserted)
    }
}

#[async_trait]
impl RecipientStore for SqliteRecipientStore {
    async fn count(&self) -> MailerResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM emails")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    #[instrument(skip_all, fields(count = count))]
    async fn sample(&self, count: u64) -> MailerResult<Vec<Recipient>> {
        let available = self.count().await?;
        if count > available {
            return Err(MailerError::insufficient_recipients(count, available));
        }

        let rows = sqlx::query("SELECT id, email, name FROM emails ORDER BY RANDOM() LIMIT $1")
            .bind(count as i64)
            .fetch_all(&self.pool)
            .await?;

        // 两次查询之间收件人被删除
        if (rows.len() as u64) < count {
            return Err(MailerError::insufficient_recipients(
                count,
                rows.len() as u64,
            ));
        }

        debug!("抽样收件人 {} 个", rows.len());
        rows.iter().map(Self::row_to_recipient).collect()
    }
}
