//! 测试数据构建器

use chrono::Utc;
use mailer_domain::{MailJob, MailJobStatus, Recipient};

/// 邮件任务构建器，默认是一个刚开始处理的 10 封任务
pub struct MailJobBuilder {
    job: MailJob,
}

impl MailJobBuilder {
    pub fn new() -> Self {
        Self {
            job: MailJob::new(10).mark_processing(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.job.id = id;
        self
    }

    pub fn with_job_id(mut self, job_id: &str) -> Self {
        self.job.job_id = job_id.to_string();
        self
    }

    pub fn with_total(mut self, total: i64) -> Self {
        self.job.total_count = total;
        self
    }

    pub fn with_counts(mut self, sent: i64, failed: i64) -> Self {
        self.job.sent_count = sent;
        self.job.failed_count = failed;
        self
    }

    pub fn with_status(mut self, status: MailJobStatus) -> Self {
        self.job.status = status;
        if status.is_terminal() {
            self.job.completed_at = Some(Utc::now());
        }
        self
    }

    pub fn pending(self) -> Self {
        self.with_status(MailJobStatus::Pending)
    }

    pub fn build(self) -> MailJob {
        self.job
    }
}

impl Default for MailJobBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RecipientBuilder {
    recipient: Recipient,
}

impl RecipientBuilder {
    pub fn new() -> Self {
        Self {
            recipient: Recipient::new(1, "user1@example.com", "User 1"),
        }
    }

    /// 按序号生成 `user{n}@example.com`
    pub fn numbered(n: i64) -> Self {
        Self {
            recipient: Recipient::new(n, format!("user{n}@example.com"), format!("User {n}")),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.recipient.id = id;
        self
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.recipient.address = address.to_string();
        self
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.recipient.display_name = name.to_string();
        self
    }

    pub fn build(self) -> Recipient {
        self.recipient
    }

    /// 一次生成 1..=count 号收件人
    pub fn batch(count: i64) -> Vec<Recipient> {
        (1..=count).map(|n| Self::numbered(n).build()).collect()
    }
}

impl Default for RecipientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
