pub mod sqlite_mail_job_repository;
pub mod sqlite_recipient_store;

pub use sqlite_mail_job_repository::SqliteMailJobRepository;
pub use sqlite_recipient_store::SqliteRecipientStore;

use std::str::FromStr;
use std::time::Duration;

use mailer_config::DatabaseConfig;
use mailer_errors::MailerResult;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS mail_jobs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        job_id TEXT NOT NULL,
        total_count INTEGER NOT NULL CHECK (total_count > 0),
        sent_count INTEGER NOT NULL DEFAULT 0 CHECK (sent_count >= 0),
        failed_count INTEGER NOT NULL DEFAULT 0 CHECK (failed_count >= 0),
        status TEXT NOT NULL DEFAULT 'PENDING',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        completed_at TEXT,
        CHECK (sent_count + failed_count <= total_count)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_mail_jobs_job_id ON mail_jobs (job_id)",
    "CREATE INDEX IF NOT EXISTS idx_mail_jobs_status ON mail_jobs (status)",
    r#"
    CREATE TABLE IF NOT EXISTS emails (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
];

pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> MailerResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(config.connection_timeout_seconds));

        // 内存库每个连接都是独立的数据库，只能使用单连接
        let max_connections = if config.url.contains(":memory:") {
            1
        } else {
            config.max_connections
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(config.min_connections.min(max_connections))
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .connect_with(options)
            .await?;

        info!("SQLite连接池已创建: {}", config.url);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> MailerResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("数据库表结构已就绪");
        Ok(())
    }

    pub async fn health_check(&self) -> MailerResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
