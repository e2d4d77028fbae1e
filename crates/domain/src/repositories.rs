//! 领域仓储抽象
//!
//! 定义数据访问的抽象接口，遵循依赖倒置原则

use async_trait::async_trait;
use mailer_errors::MailerResult;

use crate::entities::{MailCounter, MailJob, MailJobStatus, Recipient};

/// 一次计数器递增的结果
#[derive(Debug, Clone, PartialEq)]
pub enum CounterUpdate {
    /// 递增已生效，附带递增后的快照
    Applied(MailJob),
    /// 任务已是终态或计数已满，未做任何修改
    Rejected(MailJob),
}

impl CounterUpdate {
    pub fn job(&self) -> &MailJob {
        match self {
            CounterUpdate::Applied(job) | CounterUpdate::Rejected(job) => job,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, CounterUpdate::Applied(_))
    }
}

/// 邮件任务仓储抽象
///
/// 计数器只能通过 `increment_counter` 修改，状态只能通过 `transition_status` 修改。
/// 两者都必须是原子操作，实现方不能把"读取-计算-写回"拆开。
#[async_trait]
pub trait MailJobRepository: Send + Sync {
    async fn create(&self, job: &MailJob) -> MailerResult<MailJob>;
    async fn find_by_id(&self, id: i64) -> MailerResult<Option<MailJob>>;
    async fn find_all(&self) -> MailerResult<Vec<MailJob>>;

    /// 原子递增计数器并返回最新快照。
    ///
    /// 仅当任务处于 PROCESSING 且 `sent + failed < total` 时才递增；
    /// 任务不存在时返回 `MailJobNotFound`。
    async fn increment_counter(&self, id: i64, counter: MailCounter)
        -> MailerResult<CounterUpdate>;

    /// 比较并设置状态：当前状态等于 `from` 时改为 `to`，返回是否修改成功
    async fn transition_status(
        &self,
        id: i64,
        from: MailJobStatus,
        to: MailJobStatus,
    ) -> MailerResult<bool>;
}

/// 收件人存储（对核心只读）
#[async_trait]
pub trait RecipientStore: Send + Sync {
    async fn count(&self) -> MailerResult<u64>;

    /// 无放回均匀抽样；数量不足时返回 `InsufficientRecipients`
    async fn sample(&self, count: u64) -> MailerResult<Vec<Recipient>>;
}
