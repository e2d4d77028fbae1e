use std::sync::RwLock;

use async_trait::async_trait;
use mailer_domain::{entities::Recipient, repositories::RecipientStore};
use mailer_errors::{MailerError, MailerResult};
use rand::seq::IndexedRandom;

#[derive(Debug, Default)]
pub struct InMemoryRecipientStore {
    recipients: RwLock<Vec<Recipient>>,
}

impl InMemoryRecipientStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipients(recipients: Vec<Recipient>) -> Self {
        Self {
            recipients: RwLock::new(recipients),
        }
    }

    /// 生成 `user{n}@example.com` 形式的收件人
    pub fn with_generated(count: usize) -> Self {
        let recipients = (1..=count)
            .map(|n| Recipient::new(n as i64, format!("user{n}@example.com"), format!("User {n}")))
            .collect();
        Self::with_recipients(recipients)
    }

    pub fn add(&self, recipient: Recipient) -> MailerResult<()> {
        self.recipients
            .write()
            .map_err(|_| MailerError::Internal("收件人锁已中毒".to_string()))?
            .push(recipient);
        Ok(())
    }

    fn choose(&self, count: u64) -> MailerResult<Vec<Recipient>> {
        let recipients = self
            .recipients
            .read()
            .map_err(|_| MailerError::Internal("收件人锁已中毒".to_string()))?;

        let available = recipients.len() as u64;
        if count > available {
            return Err(MailerError::insufficient_recipients(count, available));
        }

        let mut rng = rand::rng();
        Ok(recipients
            .choose_multiple(&mut rng, count as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RecipientStore for InMemoryRecipientStore {
    async fn count(&self) -> MailerResult<u64> {
        let recipients = self
            .recipients
            .read()
            .map_err(|_| MailerError::Internal("收件人锁已中毒".to_string()))?;
        Ok(recipients.len() as u64)
    }

    async fn sample(&self, count: u64) -> MailerResult<Vec<Recipient>> {
        self.choose(count)
    }
}
