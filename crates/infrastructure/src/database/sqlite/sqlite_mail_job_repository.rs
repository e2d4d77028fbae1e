use async_trait::async_trait;
use chrono::Utc;
use mailer_domain::{
    entities::{MailCounter, MailJob, MailJobStatus},
    repositories::{CounterUpdate, MailJobRepository},
};
use mailer_errors::{MailerError, MailerResult};
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument};

const COLUMNS: &str = "id, job_id, total_count, sent_count, failed_count, status, \
                       created_at, updated_at, completed_at";

pub struct SqliteMailJobRepository {
    pool: SqlitePool,
}

impl SqliteMailJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_mail_job(row: &sqlx::sqlite::SqliteRow) -> MailerResult<MailJob> {
        Ok(MailJob {
            id: row.try_get("id")?,
            job_id: row.try_get("job_id")?,
            total_count: row.try_get("total_count")?,
            sent_count: row.try_get("sent_count")?,
            failed_count: row.try_get("failed_count")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }

    /// 守卫条件写在 WHERE 中，递增与读取在同一条语句内完成
    fn increment_sql(counter: MailCounter) -> String {
        let column = counter.column();
        format!(
            "UPDATE mail_jobs SET {column} = {column} + 1, updated_at = $1 \
             WHERE id = $2 AND status = 'PROCESSING' \
               AND sent_count + failed_count < total_count \
             RETURNING {COLUMNS}"
        )
    }
}

#[async_trait]
impl MailJobRepository for SqliteMailJobRepository {
    #[instrument(skip_all, fields(job_id = %job.job_id, total_count = job.total_count))]
    async fn create(&self, job: &MailJob) -> MailerResult<MailJob> {
        let row = sqlx::query(&format!(
            "INSERT INTO mail_jobs (job_id, total_count, sent_count, failed_count, status, \
                                    created_at, updated_at, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        ))
        .bind(&job.job_id)
        .bind(job.total_count)
        .bind(job.sent_count)
        .bind(job.failed_count)
        .bind(job.status)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.completed_at)
        .fetch_one(&self.pool)
        .await?;

        let created = Self::row_to_mail_job(&row)?;
        debug!("邮件任务已创建: id={}, 状态: {}", created.id, created.status);
        Ok(created)
    }

    #[instrument(skip_all, fields(mail_job_id = %id))]
    async fn find_by_id(&self, id: i64) -> MailerResult<Option<MailJob>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM mail_jobs WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_mail_job).transpose()
    }

    async fn find_all(&self) -> MailerResult<Vec<MailJob>> {
        let rows = sqlx::query(&format!("SELECT {COLUMNS} FROM mail_jobs ORDER BY id DESC"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_mail_job).collect()
    }

    #[instrument(skip_all, fields(mail_job_id = %id, counter = ?counter))]
    async fn increment_counter(
        &self,
        id: i64,
        counter: MailCounter,
    ) -> MailerResult<CounterUpdate> {
        let row = sqlx::query(&Self::increment_sql(counter))
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            return Ok(CounterUpdate::Applied(Self::row_to_mail_job(&row)?));
        }

        // 没有行被更新：任务不存在，或已终态/计数已满
        match self.find_by_id(id).await? {
            Some(job) => Ok(CounterUpdate::Rejected(job)),
            None => Err(MailerError::mail_job_not_found(id)),
        }
    }

    #[instrument(skip_all, fields(mail_job_id = %id, from = %from, to = %to))]
    async fn transition_status(
        &self,
        id: i64,
        from: MailJobStatus,
        to: MailJobStatus,
    ) -> MailerResult<bool> {
        if !from.can_transition_to(to) {
            return Err(MailerError::validation_error(format!(
                "非法的状态转换: {from} -> {to}"
            )));
        }

        let now = Utc::now();
        let completed_at = to.is_terminal().then_some(now);

        let result = sqlx::query(
            "UPDATE mail_jobs SET status = $1, updated_at = $2, \
                                  completed_at = COALESCE($3, completed_at) \
             WHERE id = $4 AND status = $5",
        )
        .bind(to)
        .bind(now)
        .bind(completed_at)
        .bind(id)
        .bind(from)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        match self.find_by_id(id).await? {
            Some(_) => Ok(false),
            None => Err(MailerError::mail_job_not_found(id)),
        }
    }
}
