use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use mailer_domain::{MessageSender, OutgoingMessage};
use mailer_errors::MailerResult;
use tracing::info;

/// 只记录日志的发送器，相当于开发环境下的投递方式
#[derive(Debug, Default)]
pub struct LogMessageSender {
    delivered: AtomicU64,
}

impl LogMessageSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MessageSender for LogMessageSender {
    async fn send(&self, message: &OutgoingMessage) -> MailerResult<()> {
        info!(
            to = %message.to,
            name = %message.display_name,
            from = %message.from,
            subject = %message.subject,
            idempotency_key = %message.idempotency_key,
            "通知邮件已投递"
        );
        self.delivered.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
