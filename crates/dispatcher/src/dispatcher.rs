use std::sync::Arc;

use mailer_config::DispatcherConfig;
use mailer_domain::{
    MailCounter, MailJob, MailJobRepository, MailJobStatus, RecipientStore, UnitOfWork, UnitQueue,
};
use mailer_errors::{MailerError, MailerResult};
use tracing::{error, info, instrument, warn};

/// 批量发送入口：抽样收件人、创建任务、投递发送单元后立即返回
pub struct Dispatcher {
    recipients: Arc<dyn RecipientStore>,
    jobs: Arc<dyn MailJobRepository>,
    queue: Arc<dyn UnitQueue>,
    max_batch_size: u64,
}

impl Dispatcher {
    pub fn new(
        recipients: Arc<dyn RecipientStore>,
        jobs: Arc<dyn MailJobRepository>,
        queue: Arc<dyn UnitQueue>,
        config: &DispatcherConfig,
    ) -> Self {
        Self {
            recipients,
            jobs,
            queue,
            max_batch_size: config.max_batch_size as u64,
        }
    }

    #[instrument(skip(self))]
    pub async fn dispatch(&self, count: u64, simulate_failures: bool) -> MailerResult<MailJob> {
        if count == 0 {
            return Err(MailerError::validation_error("发送数量必须大于0"));
        }
        if count > self.max_batch_size {
            return Err(MailerError::validation_error(format!(
                "发送数量 {} 超过单批上限 {}",
                count, self.max_batch_size
            )));
        }

        let available = self.recipients.count().await?;
        if count > available {
            warn!("收件人不足: 请求 {}，可用 {}", count, available);
            return Err(MailerError::insufficient_recipients(count, available));
        }

        let recipients = self.recipients.sample(count).await?;
        let job = self
            .jobs
            .create(&MailJob::new(count as i64).mark_processing())
            .await?;

        info!(
            "邮件任务 {} 已创建: id={}, 收件人 {} 个, 模拟失败: {}",
            job.job_id, job.id, count, simulate_failures
        );

        let mut pending = recipients.into_iter();
        while let Some(recipient) = pending.next() {
            let unit = UnitOfWork::new(&job, recipient, simulate_failures);
            if let Err(e) = self.queue.enqueue(unit).await {
                // 当前单元和之后的单元都不会被执行
                let abandoned = 1 + pending.len() as u64;
                error!(
                    "发送单元入队失败: mail_job_id={}, 未入队 {} 个, error={}",
                    job.id, abandoned, e
                );
                self.abandon_units(&job, abandoned).await?;
                return Err(e);
            }
        }

        Ok(job)
    }

    /// 把未能入队的单元记为失败，保证任务仍能进入终态
    async fn abandon_units(&self, job: &MailJob, abandoned: u64) -> MailerResult<()> {
        let mut latest = None;
        for _ in 0..abandoned {
            let update = self.jobs.increment_counter(job.id, MailCounter::Failed).await?;
            latest = Some(update.job().clone());
        }

        let Some(latest) = latest else {
            return Ok(());
        };

        if latest.all_reported() && latest.status == MailJobStatus::Processing {
            let target = MailJobStatus::terminal_for(latest.failed_count);
            if self
                .jobs
                .transition_status(job.id, MailJobStatus::Processing, target)
                .await?
            {
                warn!("邮件任务 {} 因入队失败结束: 状态 {}", job.job_id, target);
            }
        }

        Ok(())
    }

    pub async fn status(&self, mail_job_id: i64) -> MailerResult<MailJob> {
        self.jobs
            .find_by_id(mail_job_id)
            .await?
            .ok_or_else(|| MailerError::mail_job_not_found(mail_job_id))
    }

    pub async fn list(&self) -> MailerResult<Vec<MailJob>> {
        self.jobs.find_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailer_infrastructure::{InMemoryMailJobRepository, InMemoryRecipientStore};
    use mailer_testing_utils::RecordingUnitQueue;

    fn dispatcher(
        recipients: usize,
        queue: &RecordingUnitQueue,
    ) -> (Dispatcher, Arc<InMemoryMailJobRepository>) {
        let jobs = Arc::new(InMemoryMailJobRepository::new());
        let dispatcher = Dispatcher::new(
            Arc::new(InMemoryRecipientStore::with_generated(recipients)),
            jobs.clone(),
            Arc::new(queue.clone()),
            &DispatcherConfig { max_batch_size: 100 },
        );
        (dispatcher, jobs)
    }

    #[tokio::test]
    async fn test_dispatch_enqueues_one_unit_per_recipient() {
        let queue = RecordingUnitQueue::new();
        let (dispatcher, _) = dispatcher(20, &queue);

        let job = dispatcher.dispatch(10, true).await.unwrap();
        assert_eq!(job.total_count, 10);
        assert_eq!(job.status, MailJobStatus::Processing);
        assert_eq!(job.sent_count + job.failed_count, 0);

        let units = queue.units();
        assert_eq!(units.len(), 10);
        assert!(units.iter().all(|u| u.mail_job_id == job.id && u.simulate_failures));

        let mut ids: Vec<i64> = units.iter().map(|u| u.recipient.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }

    #[tokio::test]
    async fn test_dispatch_rejects_zero_and_oversized() {
        let queue = RecordingUnitQueue::new();
        let (dispatcher, jobs) = dispatcher(500, &queue);

        assert!(matches!(
            dispatcher.dispatch(0, false).await,
            Err(MailerError::ValidationError(_))
        ));
        assert!(matches!(
            dispatcher.dispatch(101, false).await,
            Err(MailerError::ValidationError(_))
        ));
        assert!(jobs.is_empty().await);
        assert_eq!(queue.count(), 0);
    }

    #[tokio::test]
    async fn test_status_of_unknown_job() {
        let queue = RecordingUnitQueue::new();
        let (dispatcher, _) = dispatcher(1, &queue);

        assert!(matches!(
            dispatcher.status(99).await,
            Err(MailerError::MailJobNotFound { id: 99 })
        ));
    }
}
