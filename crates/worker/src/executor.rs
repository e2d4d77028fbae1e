use std::sync::Arc;

use chrono::Utc;
use mailer_config::{SenderConfig, WorkerConfig};
use mailer_domain::{MessageSender, OutgoingMessage, UnitOfWork};
use mailer_errors::{MailerError, MailerResult};
use metrics::counter;
use tracing::debug;

/// 失败注入器，每次调用独立抽样
#[derive(Debug, Clone, Copy)]
pub struct FailureInjector {
    probability: f64,
}

impl FailureInjector {
    pub fn new(probability: f64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
        }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn should_fail(&self) -> bool {
        rand::random::<f64>() < self.probability
    }
}

/// 对单个收件人执行一次发送尝试
pub struct UnitExecutor {
    sender: Arc<dyn MessageSender>,
    injector: FailureInjector,
    from_address: String,
    subject: String,
}

impl UnitExecutor {
    pub fn new(
        sender: Arc<dyn MessageSender>,
        injector: FailureInjector,
        from_address: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            injector,
            from_address: from_address.into(),
            subject: subject.into(),
        }
    }

    pub fn from_config(
        sender: Arc<dyn MessageSender>,
        worker: &WorkerConfig,
        sender_config: &SenderConfig,
    ) -> Self {
        Self::new(
            sender,
            FailureInjector::new(worker.failure_probability),
            sender_config.from_address.clone(),
            sender_config.subject.clone(),
        )
    }

    pub fn sender_name(&self) -> &str {
        self.sender.name()
    }

    /// `attempt` 从 1 开始，参与幂等键的生成
    pub async fn execute(&self, unit: &UnitOfWork, attempt: u32) -> MailerResult<()> {
        counter!("mailer_send_attempts_total").increment(1);

        if unit.simulate_failures && self.injector.should_fail() {
            debug!(
                "注入模拟失败: mail_job_id={}, recipient_id={}, attempt={}",
                unit.mail_job_id, unit.recipient.id, attempt
            );
            return Err(MailerError::SimulatedFailure);
        }

        let message = OutgoingMessage {
            to: unit.recipient.address.clone(),
            display_name: unit.recipient.display_name.clone(),
            from: self.from_address.clone(),
            subject: self.subject.clone(),
            idempotency_key: unit.idempotency_key(attempt),
            requested_at: Utc::now(),
        };

        self.sender.send(&message).await
    }
}
