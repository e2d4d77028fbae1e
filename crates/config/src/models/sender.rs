use crate::validation::{ConfigValidator, ValidationUtils};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SenderKind {
    /// 只写日志，不真正投递
    #[default]
    Log,
    /// 以 JSON POST 到 webhook
    Webhook,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderConfig {
    pub kind: SenderKind,
    pub from_address: String,
    pub subject: String,
    pub webhook_url: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            kind: SenderKind::Log,
            from_address: "test@example.com".to_string(),
            subject: "テスト送信メール".to_string(),
            webhook_url: None,
            timeout_seconds: 10,
        }
    }
}

impl ConfigValidator for SenderConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_not_empty(&self.from_address, "sender.from_address")?;
        ValidationUtils::validate_not_empty(&self.subject, "sender.subject")?;
        ValidationUtils::validate_timeout_seconds(self.timeout_seconds)?;

        if self.kind == SenderKind::Webhook {
            let url = self.webhook_url.as_deref().ok_or_else(|| {
                crate::ConfigError::Validation(
                    "sender.webhook_url is required when sender.kind = webhook".to_string(),
                )
            })?;
            ValidationUtils::validate_http_url(url, "sender.webhook_url")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_config_validation() {
        let config = SenderConfig::default();
        assert!(config.validate().is_ok());

        let mut webhook = config.clone();
        webhook.kind = SenderKind::Webhook;
        assert!(webhook.validate().is_err());

        webhook.webhook_url = Some("http://localhost:9000/deliver".to_string());
        assert!(webhook.validate().is_ok());

        webhook.webhook_url = Some("not a url".to_string());
        assert!(webhook.validate().is_err());

        let mut invalid_config = config.clone();
        invalid_config.from_address = "".to_string();
        assert!(invalid_config.validate().is_err());
    }
}
