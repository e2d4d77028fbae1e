use std::sync::Arc;

use async_trait::async_trait;
use mailer_config::WorkerConfig;
use mailer_domain::{OutcomeReporter, UnitOfWork, UnitQueue};
use mailer_errors::{MailerError, MailerResult};
use metrics::counter;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::executor::UnitExecutor;
use crate::retry::RetryPolicy;

/// 入队句柄，Dispatcher 通过它投递发送单元
#[derive(Debug, Clone)]
pub struct WorkerPoolHandle {
    sender: mpsc::UnboundedSender<UnitOfWork>,
}

#[async_trait]
impl UnitQueue for WorkerPoolHandle {
    async fn enqueue(&self, unit: UnitOfWork) -> MailerResult<()> {
        self.sender
            .send(unit)
            .map_err(|_| MailerError::QueueClosed)
    }
}

/// 固定数量的 worker 共享一个无界队列
pub struct WorkerPool {
    handle: WorkerPoolHandle,
    workers: Vec<JoinHandle<()>>,
}

struct WorkerContext {
    executor: Arc<UnitExecutor>,
    retry: RetryPolicy,
    reporter: Arc<dyn OutcomeReporter>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<UnitOfWork>>>,
}

impl WorkerPool {
    pub fn start(
        worker_count: usize,
        executor: Arc<UnitExecutor>,
        retry: RetryPolicy,
        reporter: Arc<dyn OutcomeReporter>,
        shutdown: &broadcast::Sender<()>,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let context = Arc::new(WorkerContext {
            executor,
            retry,
            reporter,
            receiver: Arc::new(Mutex::new(receiver)),
        });

        let worker_count = worker_count.max(1);
        let workers = (0..worker_count)
            .map(|worker_id| {
                let context = Arc::clone(&context);
                let shutdown_rx = shutdown.subscribe();
                tokio::spawn(run_worker(worker_id, context, shutdown_rx))
            })
            .collect();

        info!(
            "worker池已启动: {} 个worker, 最大尝试次数 {}, 发送器 {}",
            worker_count,
            context.retry.max_attempts(),
            context.executor.sender_name()
        );

        Self {
            handle: WorkerPoolHandle { sender },
            workers,
        }
    }

    pub fn from_config(
        config: &WorkerConfig,
        executor: Arc<UnitExecutor>,
        reporter: Arc<dyn OutcomeReporter>,
        shutdown: &broadcast::Sender<()>,
    ) -> Self {
        Self::start(
            config.worker_count,
            executor,
            RetryPolicy::from_config(config),
            reporter,
            shutdown,
        )
    }

    pub fn handle(&self) -> WorkerPoolHandle {
        self.handle.clone()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// 丢弃自身的入队端并等待所有 worker 退出
    ///
    /// 其他句柄仍存活时，worker 只在收到关闭信号后退出。
    pub async fn join(self) {
        drop(self.handle);
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!("worker 异常退出: {}", e);
            }
        }
        info!("worker池已停止");
    }
}

async fn run_worker(
    worker_id: usize,
    context: Arc<WorkerContext>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    debug!("worker {} 已启动", worker_id);

    loop {
        let unit = tokio::select! {
            unit = next_unit(&context.receiver) => unit,
            _ = shutdown_rx.recv() => {
                info!("worker {} 收到关闭信号，停止接收新单元", worker_id);
                break;
            }
        };

        let Some(unit) = unit else {
            debug!("队列已关闭，worker {} 退出", worker_id);
            break;
        };

        process_unit(worker_id, &context, unit).await;
    }
}

async fn next_unit(
    receiver: &Mutex<mpsc::UnboundedReceiver<UnitOfWork>>,
) -> Option<UnitOfWork> {
    receiver.lock().await.recv().await
}

async fn process_unit(worker_id: usize, context: &WorkerContext, unit: UnitOfWork) {
    let outcome = context.retry.run(&context.executor, &unit).await;

    if outcome.is_success() {
        counter!("mailer_units_succeeded_total").increment(1);
    } else {
        counter!("mailer_units_failed_total").increment(1);
        warn!(
            "发送单元最终失败: worker={}, mail_job_id={}, recipient_id={}, attempts={}",
            worker_id,
            unit.mail_job_id,
            unit.recipient.id,
            outcome.attempts()
        );
    }

    if let Err(e) = context.reporter.report(&unit, &outcome).await {
        if e.is_fatal() {
            error!(
                "上报结果失败（不重试）: mail_job_id={}, recipient_id={}, error={}",
                unit.mail_job_id, unit.recipient.id, e
            );
        } else {
            warn!(
                "上报结果失败: mail_job_id={}, recipient_id={}, error={}",
                unit.mail_job_id, unit.recipient.id, e
            );
        }
    }
}
