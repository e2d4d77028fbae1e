pub mod log_sender;
pub mod webhook_sender;

pub use log_sender::LogMessageSender;
pub use webhook_sender::WebhookMessageSender;

use std::sync::Arc;
use std::time::Duration;

use mailer_config::{SenderConfig, SenderKind};
use mailer_domain::MessageSender;
use mailer_errors::{MailerError, MailerResult};
use tracing::info;

/// 根据配置创建发送器
pub fn create_message_sender(config: &SenderConfig) -> MailerResult<Arc<dyn MessageSender>> {
    let sender: Arc<dyn MessageSender> = match config.kind {
        SenderKind::Log => Arc::new(LogMessageSender::new()),
        SenderKind::Webhook => {
            let url = config.webhook_url.as_deref().ok_or_else(|| {
                MailerError::config_error("sender.kind = webhook 时必须配置 sender.webhook_url")
            })?;
            Arc::new(WebhookMessageSender::new(
                url,
                Duration::from_secs(config.timeout_seconds),
            )?)
        }
    };

    info!("使用发送器: {}", sender.name());
    Ok(sender)
}
