use async_trait::async_trait;
use mailer_errors::MailerResult;

use crate::entities::{OutgoingMessage, UnitOfWork, UnitOutcome};

/// 外部发送原语，每次尝试调用一次，可能失败
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, message: &OutgoingMessage) -> MailerResult<()>;

    fn name(&self) -> &str;
}

/// 发送单元队列，Dispatcher 只负责入队，不等待执行
#[async_trait]
pub trait UnitQueue: Send + Sync {
    async fn enqueue(&self, unit: UnitOfWork) -> MailerResult<()>;
}

/// 单元终态的上报接口
#[async_trait]
pub trait OutcomeReporter: Send + Sync {
    async fn report(&self, unit: &UnitOfWork, outcome: &UnitOutcome) -> MailerResult<()>;
}
