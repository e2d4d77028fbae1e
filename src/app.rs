use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use mailer_config::AppConfig;
use mailer_dispatcher::{BatchAggregator, Dispatcher};
use mailer_domain::{MailJob, MailJobRepository};
use mailer_errors::{MailerError, MailerResult};
use mailer_infrastructure::{
    create_message_sender, DatabaseManager, SqliteMailJobRepository, SqliteRecipientStore,
};
use mailer_worker::{UnitExecutor, WorkerPool};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::shutdown::ShutdownManager;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// 命令行各子命令共用的应用上下文
pub struct Application {
    config: AppConfig,
    database: DatabaseManager,
    jobs: Arc<SqliteMailJobRepository>,
    recipients: Arc<SqliteRecipientStore>,
}

impl Application {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let database = DatabaseManager::new(&config.database)
            .await
            .context("连接数据库失败")?;
        database.migrate().await.context("初始化数据库表失败")?;

        let jobs = Arc::new(SqliteMailJobRepository::new(database.pool().clone()));
        let recipients = Arc::new(SqliteRecipientStore::new(database.pool().clone()));

        Ok(Self {
            config,
            database,
            jobs,
            recipients,
        })
    }

    /// 生成 `user{n}@example.com` 形式的收件人，返回实际新增数量
    pub async fn seed(&self, count: usize) -> Result<u64> {
        let recipients: Vec<(String, String)> = (1..=count)
            .map(|n| (format!("user{n}@example.com"), format!("User {n}")))
            .collect();

        let inserted = self.recipients.insert_many(&recipients).await?;
        Ok(inserted)
    }

    pub async fn status(&self, mail_job_id: i64) -> Result<MailJob> {
        let job = self
            .jobs
            .find_by_id(mail_job_id)
            .await?
            .ok_or_else(|| MailerError::mail_job_not_found(mail_job_id))?;
        Ok(job)
    }

    /// 发送一批邮件，并在进程内等待所有单元上报完毕
    ///
    /// worker 运行在当前进程中，所以即使不打印进度也要等到任务进入终态；
    /// 收到关闭信号时停止接收新单元并返回当前快照。
    pub async fn send(
        &self,
        count: u64,
        simulate_failures: bool,
        show_progress: bool,
        shutdown: &ShutdownManager,
    ) -> Result<MailJob> {
        let sender = create_message_sender(&self.config.sender)?;
        let executor = Arc::new(UnitExecutor::from_config(
            sender,
            &self.config.worker,
            &self.config.sender,
        ));
        let aggregator = Arc::new(BatchAggregator::new(self.jobs.clone()));

        let (pool_shutdown, _) = broadcast::channel(1);
        let pool = WorkerPool::from_config(&self.config.worker, executor, aggregator, &pool_shutdown);

        let dispatcher = Dispatcher::new(
            self.recipients.clone(),
            self.jobs.clone(),
            Arc::new(pool.handle()),
            &self.config.dispatcher,
        );

        let job = match dispatcher.dispatch(count, simulate_failures).await {
            Ok(job) => job,
            Err(e) => return finish_send(pool, &pool_shutdown, Err(e)).await,
        };
        println!("已创建邮件任务: id={}, job_id={}", job.id, job.job_id);

        let shutdown_rx = shutdown.subscribe().await;
        let result = watch_job(&dispatcher, job, show_progress, shutdown_rx).await;
        let latest = finish_send(pool, &pool_shutdown, result).await?;

        info!("邮件任务 {} 当前状态: {}", latest.job_id, latest.status);
        Ok(latest)
    }

    pub async fn close(&self) {
        self.database.close().await;
    }
}

/// 轮询任务状态直到终态或收到关闭信号
async fn watch_job(
    dispatcher: &Dispatcher,
    job: MailJob,
    show_progress: bool,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> MailerResult<MailJob> {
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    let mut latest = job;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_rx.recv() => {
                warn!("收到关闭信号，邮件任务 {} 未完成", latest.job_id);
                return Ok(latest);
            }
        }

        latest = dispatcher.status(latest.id).await?;
        if show_progress {
            print_progress(&latest);
        }
        if latest.is_finished() {
            return Ok(latest);
        }
    }
}

/// 无论轮询结果如何都先停止 worker 池，再返回结果
async fn finish_send(
    pool: WorkerPool,
    pool_shutdown: &broadcast::Sender<()>,
    result: MailerResult<MailJob>,
) -> Result<MailJob> {
    let _ = pool_shutdown.send(());
    pool.join().await;
    Ok(result?)
}

pub fn print_progress(job: &MailJob) {
    println!(
        "[{}] 进度 {:.1}%  成功 {}  失败 {}  剩余 {}",
        job.status,
        job.progress_percentage(),
        job.sent_count,
        job.failed_count,
        job.remaining_count()
    );
}

pub fn print_job(job: &MailJob) {
    println!("id:           {}", job.id);
    println!("job_id:       {}", job.job_id);
    println!("status:       {}", job.status);
    println!("total:        {}", job.total_count);
    println!("sent:         {}", job.sent_count);
    println!("failed:       {}", job.failed_count);
    println!("progress:     {:.1}%", job.progress_percentage());
    println!("created_at:   {}", job.created_at);
    if let Some(completed_at) = job.completed_at {
        println!("completed_at: {completed_at}");
    }
}
