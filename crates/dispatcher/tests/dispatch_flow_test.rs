use std::sync::Arc;
use std::time::Duration;

use mailer_config::DispatcherConfig;
use mailer_dispatcher::{BatchAggregator, Dispatcher};
use mailer_domain::{MailJobRepository, MailJobStatus, RecipientStore};
use mailer_errors::MailerError;
use mailer_infrastructure::{InMemoryMailJobRepository, InMemoryRecipientStore};
use mailer_testing_utils::{MockMessageSender, RecordingUnitQueue, TestEnv};
use mailer_worker::{FailureInjector, RetryPolicy, UnitExecutor, WorkerPool};
use tokio::sync::broadcast;

struct Harness {
    dispatcher: Dispatcher,
    jobs: Arc<InMemoryMailJobRepository>,
    pool: WorkerPool,
    _shutdown: broadcast::Sender<()>,
}

fn harness(recipients: usize, sender: &MockMessageSender, failure_probability: f64) -> Harness {
    let jobs = Arc::new(InMemoryMailJobRepository::new());
    let (shutdown_tx, _) = broadcast::channel(1);

    let executor = Arc::new(UnitExecutor::new(
        Arc::new(sender.clone()),
        FailureInjector::new(failure_probability),
        "test@example.com",
        "subject",
    ));
    let pool = WorkerPool::start(
        4,
        executor,
        RetryPolicy::new(3),
        Arc::new(BatchAggregator::new(jobs.clone())),
        &shutdown_tx,
    );
    let dispatcher = Dispatcher::new(
        Arc::new(InMemoryRecipientStore::with_generated(recipients)),
        jobs.clone(),
        Arc::new(pool.handle()),
        &DispatcherConfig::default(),
    );

    Harness {
        dispatcher,
        jobs,
        pool,
        _shutdown: shutdown_tx,
    }
}

#[tokio::test]
async fn test_batch_completes_when_all_sends_succeed() {
    let sender = MockMessageSender::new();
    let h = harness(30, &sender, 0.0);

    let job = h.dispatcher.dispatch(20, false).await.unwrap();
    let finished = TestEnv::wait_for_finished(h.jobs.as_ref(), job.id, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(finished.status, MailJobStatus::Completed);
    assert_eq!(finished.sent_count, 20);
    assert_eq!(finished.failed_count, 0);
    assert_eq!(sender.sent_count(), 20);
    assert_eq!(h.pool.worker_count(), 4);
}

#[tokio::test]
async fn test_batch_fails_when_one_recipient_always_fails() {
    let sender = MockMessageSender::new();
    sender.fail_address("user1@example.com");
    let h = harness(5, &sender, 0.0);

    let job = h.dispatcher.dispatch(5, false).await.unwrap();
    let finished = TestEnv::wait_for_finished(h.jobs.as_ref(), job.id, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(finished.status, MailJobStatus::Failed);
    assert_eq!(finished.sent_count, 4);
    assert_eq!(finished.failed_count, 1);
    assert_eq!(sender.attempts_for("user1@example.com"), 3);
}

#[tokio::test]
async fn test_simulated_failures_account_for_every_unit() {
    let sender = MockMessageSender::new();
    let h = harness(200, &sender, 0.3);

    let job = h.dispatcher.dispatch(200, true).await.unwrap();
    let finished = TestEnv::wait_for_finished(h.jobs.as_ref(), job.id, Duration::from_secs(10))
        .await
        .unwrap();

    assert!(finished.is_finished());
    assert_eq!(finished.sent_count + finished.failed_count, 200);
    assert_eq!(sender.sent_count() as i64, finished.sent_count);
    if finished.failed_count == 0 {
        assert_eq!(finished.status, MailJobStatus::Completed);
    } else {
        assert_eq!(finished.status, MailJobStatus::Failed);
    }
}

#[tokio::test]
async fn test_insufficient_recipients_creates_no_job() {
    let jobs = Arc::new(InMemoryMailJobRepository::new());
    let queue = RecordingUnitQueue::new();
    let recipients = Arc::new(InMemoryRecipientStore::with_generated(10));
    let dispatcher = Dispatcher::new(
        recipients.clone(),
        jobs.clone(),
        Arc::new(queue.clone()),
        &DispatcherConfig::default(),
    );

    let err = dispatcher.dispatch(50, false).await.unwrap_err();
    assert!(matches!(
        err,
        MailerError::InsufficientRecipients {
            requested: 50,
            available: 10
        }
    ));
    assert!(jobs.find_all().await.unwrap().is_empty());
    assert_eq!(queue.count(), 0);
    assert_eq!(recipients.count().await.unwrap(), 10);
}

#[tokio::test]
async fn test_status_reports_progress() {
    let queue = RecordingUnitQueue::new();
    let jobs = Arc::new(InMemoryMailJobRepository::new());
    let dispatcher = Dispatcher::new(
        Arc::new(InMemoryRecipientStore::with_generated(3)),
        jobs.clone(),
        Arc::new(queue.clone()),
        &DispatcherConfig::default(),
    );
    let aggregator = BatchAggregator::new(jobs.clone());

    let job = dispatcher.dispatch(3, false).await.unwrap();
    aggregator.record_success(job.id).await.unwrap();

    let status = dispatcher.status(job.id).await.unwrap();
    assert_eq!(status.sent_count, 1);
    assert_eq!(status.remaining_count(), 2);
    assert_eq!(status.status, MailJobStatus::Processing);
    assert_eq!(dispatcher.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_enqueue_failure_counts_remaining_units_as_failed() {
    let jobs = Arc::new(InMemoryMailJobRepository::new());
    let queue = RecordingUnitQueue::new();
    queue.close_after(3);
    let dispatcher = Dispatcher::new(
        Arc::new(InMemoryRecipientStore::with_generated(5)),
        jobs.clone(),
        Arc::new(queue.clone()),
        &DispatcherConfig::default(),
    );

    let err = dispatcher.dispatch(5, false).await.unwrap_err();
    assert!(matches!(err, MailerError::QueueClosed));

    let all = jobs.find_all().await.unwrap();
    assert_eq!(all.len(), 1);
    let job = &all[0];
    assert_eq!(job.failed_count, 2);
    assert_eq!(job.status, MailJobStatus::Processing);

    // 已入队的 3 个单元上报后任务进入终态
    let aggregator = BatchAggregator::new(jobs.clone());
    for unit in queue.units() {
        aggregator.record_success(unit.mail_job_id).await.unwrap();
    }

    let finished = dispatcher.status(job.id).await.unwrap();
    assert_eq!(finished.sent_count, 3);
    assert_eq!(finished.failed_count, 2);
    assert_eq!(finished.status, MailJobStatus::Failed);
}

#[tokio::test]
async fn test_closed_queue_fails_job_immediately() {
    let jobs = Arc::new(InMemoryMailJobRepository::new());
    let queue = RecordingUnitQueue::new();
    queue.close();
    let dispatcher = Dispatcher::new(
        Arc::new(InMemoryRecipientStore::with_generated(4)),
        jobs.clone(),
        Arc::new(queue.clone()),
        &DispatcherConfig::default(),
    );

    assert!(matches!(
        dispatcher.dispatch(4, false).await,
        Err(MailerError::QueueClosed)
    ));

    let all = jobs.find_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].failed_count, 4);
    assert_eq!(all[0].status, MailJobStatus::Failed);
    assert!(all[0].completed_at.is_some());
}
