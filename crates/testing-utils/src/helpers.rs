//! 异步测试辅助

use mailer_domain::{MailJob, MailJobRepository};
use std::time::{Duration, Instant};
use tokio::time::sleep;

pub struct TestEnv;

impl TestEnv {
    /// 轮询直到条件成立或超时，返回条件是否成立
    pub async fn wait_for<F, Fut>(mut condition: F, timeout: Duration) -> bool
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let start = Instant::now();

        while start.elapsed() < timeout {
            if condition().await {
                return true;
            }
            sleep(Duration::from_millis(20)).await;
        }

        false
    }

    /// 等待邮件任务进入终态，返回最后一次读到的快照
    pub async fn wait_for_finished(
        repo: &dyn MailJobRepository,
        id: i64,
        timeout: Duration,
    ) -> Option<MailJob> {
        let start = Instant::now();
        let mut last = None;

        while start.elapsed() < timeout {
            last = repo.find_by_id(id).await.ok().flatten();
            if last.as_ref().is_some_and(MailJob::is_finished) {
                return last;
            }
            sleep(Duration::from_millis(20)).await;
        }

        last
    }
}
