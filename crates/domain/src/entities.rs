use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 邮件任务（一次批量发送）
///
/// `total_count` 创建后固定不变；`sent_count` 和 `failed_count` 只增不减，
/// 且两者之和永远不超过 `total_count`。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MailJob {
    pub id: i64,
    pub job_id: String,
    pub total_count: i64,
    pub sent_count: i64,
    pub failed_count: i64,
    pub status: MailJobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MailJobStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "PROCESSING")]
    Processing,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    Failed,
}

impl MailJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MailJobStatus::Pending => "PENDING",
            MailJobStatus::Processing => "PROCESSING",
            MailJobStatus::Completed => "COMPLETED",
            MailJobStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MailJobStatus::Completed | MailJobStatus::Failed)
    }

    /// 状态机: PENDING -> PROCESSING -> COMPLETED | FAILED，终态不可离开
    pub fn can_transition_to(&self, next: MailJobStatus) -> bool {
        matches!(
            (self, next),
            (MailJobStatus::Pending, MailJobStatus::Processing)
                | (MailJobStatus::Processing, MailJobStatus::Completed)
                | (MailJobStatus::Processing, MailJobStatus::Failed)
        )
    }

    /// 达到总数时的终态：全部成功为 COMPLETED，只要有一个失败即为 FAILED
    pub fn terminal_for(failed_count: i64) -> Self {
        if failed_count == 0 {
            MailJobStatus::Completed
        } else {
            MailJobStatus::Failed
        }
    }
}

impl fmt::Display for MailJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MailJobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(MailJobStatus::Pending),
            "PROCESSING" => Ok(MailJobStatus::Processing),
            "COMPLETED" => Ok(MailJobStatus::Completed),
            "FAILED" => Ok(MailJobStatus::Failed),
            _ => Err(format!("Invalid mail job status: {s}")),
        }
    }
}

impl MailJob {
    pub fn new(total_count: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // 将由存储层生成
            job_id: Uuid::new_v4().to_string(),
            total_count,
            sent_count: 0,
            failed_count: 0,
            status: MailJobStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn mark_processing(mut self) -> Self {
        self.status = MailJobStatus::Processing;
        self
    }

    pub fn reported_count(&self) -> i64 {
        self.sent_count + self.failed_count
    }

    pub fn remaining_count(&self) -> i64 {
        self.total_count - self.reported_count()
    }

    /// 已上报比例，保留一位小数
    pub fn progress_percentage(&self) -> f64 {
        if self.total_count <= 0 {
            return 0.0;
        }
        let ratio = self.reported_count() as f64 / self.total_count as f64 * 100.0;
        (ratio * 10.0).round() / 10.0
    }

    pub fn all_reported(&self) -> bool {
        self.reported_count() >= self.total_count
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// 当前计数是否还能接受一次上报
    pub fn accepts_report(&self) -> bool {
        self.status == MailJobStatus::Processing && !self.all_reported()
    }

    pub fn apply(&mut self, counter: MailCounter) {
        match counter {
            MailCounter::Sent => self.sent_count += 1,
            MailCounter::Failed => self.failed_count += 1,
        }
        self.updated_at = Utc::now();
    }

    pub fn update_status(&mut self, status: MailJobStatus) {
        self.status = status;
        self.updated_at = Utc::now();
        if status.is_terminal() && self.completed_at.is_none() {
            self.completed_at = Some(self.updated_at);
        }
    }
}

/// 计数器种类
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MailCounter {
    Sent,
    Failed,
}

impl MailCounter {
    pub fn column(&self) -> &'static str {
        match self {
            MailCounter::Sent => "sent_count",
            MailCounter::Failed => "failed_count",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipient {
    pub id: i64,
    pub address: String,
    pub display_name: String,
}

impl Recipient {
    pub fn new<A: Into<String>, N: Into<String>>(id: i64, address: A, display_name: N) -> Self {
        Self {
            id,
            address: address.into(),
            display_name: display_name.into(),
        }
    }
}

/// 单个收件人的发送单元，由唯一的 worker 独占处理
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitOfWork {
    pub mail_job_id: i64,
    pub job_id: String,
    pub recipient: Recipient,
    pub simulate_failures: bool,
}

impl UnitOfWork {
    pub fn new(job: &MailJob, recipient: Recipient, simulate_failures: bool) -> Self {
        Self {
            mail_job_id: job.id,
            job_id: job.job_id.clone(),
            recipient,
            simulate_failures,
        }
    }

    pub fn idempotency_key(&self, attempt: u32) -> String {
        format!("{}:{}:{}", self.job_id, self.recipient.id, attempt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Succeeded { attempts: u32 },
    Failed { attempts: u32, last_error: String },
}

impl UnitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UnitOutcome::Succeeded { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            UnitOutcome::Succeeded { attempts } | UnitOutcome::Failed { attempts, .. } => *attempts,
        }
    }

    pub fn counter(&self) -> MailCounter {
        if self.is_success() {
            MailCounter::Sent
        } else {
            MailCounter::Failed
        }
    }
}

/// 交给 MessageSender 的一封通知
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub to: String,
    pub display_name: String,
    pub from: String,
    pub subject: String,
    pub idempotency_key: String,
    pub requested_at: DateTime<Utc>,
}
