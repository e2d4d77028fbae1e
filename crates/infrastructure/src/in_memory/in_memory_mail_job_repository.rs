use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mailer_domain::{
    entities::{MailCounter, MailJob, MailJobStatus},
    repositories::{CounterUpdate, MailJobRepository},
};
use mailer_errors::{MailerError, MailerResult};
use tokio::sync::RwLock;
use tracing::debug;

/// 内存邮件任务仓储
///
/// 每个任务一把互斥锁，递增与守卫检查在同一个锁内完成，
/// 不同任务之间互不阻塞。
#[derive(Debug, Default)]
pub struct InMemoryMailJobRepository {
    jobs: RwLock<HashMap<i64, Arc<Mutex<MailJob>>>>,
    next_id: AtomicI64,
}

impl InMemoryMailJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, id: i64) -> MailerResult<Arc<Mutex<MailJob>>> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| MailerError::mail_job_not_found(id))
    }

    fn with_job<T>(slot: &Mutex<MailJob>, f: impl FnOnce(&mut MailJob) -> T) -> MailerResult<T> {
        let mut job = slot
            .lock()
            .map_err(|_| MailerError::Internal("邮件任务锁已中毒".to_string()))?;
        Ok(f(&mut *job))
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait]
impl MailJobRepository for InMemoryMailJobRepository {
    async fn create(&self, job: &MailJob) -> MailerResult<MailJob> {
        let mut created = job.clone();
        created.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;

        self.jobs
            .write()
            .await
            .insert(created.id, Arc::new(Mutex::new(created.clone())));

        debug!("内存邮件任务已创建: id={}", created.id);
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> MailerResult<Option<MailJob>> {
        let slot = self.jobs.read().await.get(&id).cloned();
        match slot {
            Some(slot) => Self::with_job(&slot, |job| Some(job.clone())),
            None => Ok(None),
        }
    }

    async fn find_all(&self) -> MailerResult<Vec<MailJob>> {
        let slots: Vec<_> = self.jobs.read().await.values().cloned().collect();
        let mut jobs = slots
            .iter()
            .map(|slot| Self::with_job(slot, |job| job.clone()))
            .collect::<MailerResult<Vec<_>>>()?;
        jobs.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(jobs)
    }

    async fn increment_counter(
        &self,
        id: i64,
        counter: MailCounter,
    ) -> MailerResult<CounterUpdate> {
        let slot = self.slot(id).await?;
        Self::with_job(&slot, |job| {
            if !job.accepts_report() {
                return CounterUpdate::Rejected(job.clone());
            }
            job.apply(counter);
            CounterUpdate::Applied(job.clone())
        })
    }

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

        let slot = self.slot(id).await?;
        Self::with_job(&slot, |job| {
            if job.status != from {
                return false;
            }
            job.update_status(to);
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let repo = InMemoryMailJobRepository::new();
        let first = repo.create(&MailJob::new(1)).await.unwrap();
        let second = repo.create(&MailJob::new(2)).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(repo.len().await, 2);

        let all = repo.find_all().await.unwrap();
        assert_eq!(all[0].id, 2);
        assert_eq!(all[1].id, 1);
    }

    #[tokio::test]
    async fn test_increment_rejected_when_full_or_not_processing() {
        let repo = InMemoryMailJobRepository::new();
        let pending = repo.create(&MailJob::new(1)).await.unwrap();
        let update = repo
            .increment_counter(pending.id, MailCounter::Sent)
            .await
            .unwrap();
        assert!(!update.is_applied());

        let job = repo
            .create(&MailJob::new(1).mark_processing())
            .await
            .unwrap();
        let update = repo.increment_counter(job.id, MailCounter::Failed).await.unwrap();
        assert!(update.is_applied());
        assert_eq!(update.job().failed_count, 1);

        let update = repo.increment_counter(job.id, MailCounter::Sent).await.unwrap();
        assert!(!update.is_applied());
        assert_eq!(update.job().sent_count, 0);
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let repo = InMemoryMailJobRepository::new();
        assert!(repo.find_by_id(99).await.unwrap().is_none());
        assert!(matches!(
            repo.increment_counter(99, MailCounter::Sent).await,
            Err(MailerError::MailJobNotFound { id: 99 })
        ));
        assert!(matches!(
            repo.transition_status(99, MailJobStatus::Processing, MailJobStatus::Completed)
                .await,
            Err(MailerError::MailJobNotFound { id: 99 })
        ));
    }

    #[tokio::test]
    async fn test_transition_is_compare_and_set() {
        let repo = InMemoryMailJobRepository::new();
        let job = repo
            .create(&MailJob::new(1).mark_processing())
            .await
            .unwrap();

        assert!(repo
            .transition_status(job.id, MailJobStatus::Processing, MailJobStatus::Failed)
            .await
            .unwrap());
        assert!(!repo
            .transition_status(job.id, MailJobStatus::Processing, MailJobStatus::Completed)
            .await
            .unwrap());

        let stored = repo.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MailJobStatus::Failed);
        assert!(stored.completed_at.is_some());

        assert!(repo
            .transition_status(job.id, MailJobStatus::Completed, MailJobStatus::Processing)
            .await
            .is_err());
    }
}
