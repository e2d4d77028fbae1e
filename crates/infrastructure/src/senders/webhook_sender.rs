use std::time::Duration;

use async_trait::async_trait;
use mailer_domain::{MessageSender, OutgoingMessage};
use mailer_errors::{MailerError, MailerResult};
use tracing::debug;

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// 把通知以 JSON POST 到 webhook，由下游完成真正的投递
#[derive(Debug, Clone)]
pub struct WebhookMessageSender {
    client: reqwest::Client,
    url: String,
}

impl WebhookMessageSender {
    pub fn new(url: &str, timeout: Duration) -> MailerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MailerError::config_error(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl MessageSender for WebhookMessageSender {
    async fn send(&self, message: &OutgoingMessage) -> MailerResult<()> {
        let response = self
            .client
            .post(&self.url)
            .header(IDEMPOTENCY_HEADER, &message.idempotency_key)
            .json(message)
            .send()
            .await
            .map_err(|e| MailerError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailerError::send_failed(format!(
                "webhook 返回状态码 {status}"
            )));
        }

        debug!("webhook 投递成功: to={}, status={}", message.to, status);
        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }
}
