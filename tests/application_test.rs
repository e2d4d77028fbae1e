use mailer::{Application, ShutdownManager};
use mailer_config::AppConfig;
use mailer_domain::MailJobStatus;
use mailer_errors::MailerError;

async fn application(dir: &tempfile::TempDir) -> Application {
    let mut config = AppConfig::default();
    config.database.url = format!("sqlite://{}", dir.path().join("app.db").display());
    config.worker.worker_count = 4;
    Application::new(config).await.unwrap()
}

#[tokio::test]
async fn test_seed_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let app = application(&dir).await;

    assert_eq!(app.seed(20).await.unwrap(), 20);
    assert_eq!(app.seed(25).await.unwrap(), 5);
    app.close().await;
}

#[tokio::test]
async fn test_send_runs_batch_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let app = application(&dir).await;
    app.seed(30).await.unwrap();

    let shutdown = ShutdownManager::new();
    let job = app.send(10, false, false, &shutdown).await.unwrap();

    assert_eq!(job.status, MailJobStatus::Completed);
    assert_eq!(job.sent_count, 10);
    assert_eq!(job.failed_count, 0);

    let stored = app.status(job.id).await.unwrap();
    assert_eq!(stored.status, MailJobStatus::Completed);
    assert!(stored.completed_at.is_some());
    app.close().await;
}

#[tokio::test]
async fn test_send_with_simulated_failures_accounts_for_all_units() {
    let dir = tempfile::tempdir().unwrap();
    let app = application(&dir).await;
    app.seed(50).await.unwrap();

    let shutdown = ShutdownManager::new();
    let job = app.send(50, true, false, &shutdown).await.unwrap();

    assert!(job.is_finished());
    assert_eq!(job.sent_count + job.failed_count, 50);
    app.close().await;
}

#[tokio::test]
async fn test_send_more_than_available_fails() {
    let dir = tempfile::tempdir().unwrap();
    let app = application(&dir).await;
    app.seed(10).await.unwrap();

    let shutdown = ShutdownManager::new();
    let err = app.send(50, false, false, &shutdown).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MailerError>(),
        Some(MailerError::InsufficientRecipients {
            requested: 50,
            available: 10
        })
    ));
    app.close().await;
}

#[tokio::test]
async fn test_status_of_unknown_job() {
    let dir = tempfile::tempdir().unwrap();
    let app = application(&dir).await;

    let err = app.status(1).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MailerError>(),
        Some(MailerError::MailJobNotFound { id: 1 })
    ));
    app.close().await;
}
