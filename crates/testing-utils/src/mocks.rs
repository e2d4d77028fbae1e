//! 测试替身：可编排失败的发送器、记录上报的 reporter、记录入队的队列

use async_trait::async_trait;
use mailer_domain::{
    MessageSender, OutcomeReporter, OutgoingMessage, UnitOfWork, UnitOutcome, UnitQueue,
};
use mailer_errors::{MailerError, MailerResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 可编排结果的发送器
///
/// 默认每次都成功。`fail_next(n)` 让接下来的 n 次调用失败，
/// `fail_address` 让发往某个地址的调用始终失败。
#[derive(Debug, Clone, Default)]
pub struct MockMessageSender {
    sent: Arc<Mutex<Vec<OutgoingMessage>>>,
    scripted_failures: Arc<Mutex<usize>>,
    failing_addresses: Arc<Mutex<Vec<String>>>,
    attempts_by_address: Arc<Mutex<HashMap<String, u32>>>,
}

impl MockMessageSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, times: usize) {
        *self.scripted_failures.lock().unwrap() += times;
    }

    pub fn fail_address(&self, address: &str) {
        self.failing_addresses
            .lock()
            .unwrap()
            .push(address.to_string());
    }

    /// 发送成功的消息
    pub fn sent_messages(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// 包含失败在内的调用次数
    pub fn attempts_for(&self, address: &str) -> u32 {
        self.attempts_by_address
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_attempts(&self) -> u32 {
        self.attempts_by_address.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl MessageSender for MockMessageSender {
    async fn send(&self, message: &OutgoingMessage) -> MailerResult<()> {
        *self
            .attempts_by_address
            .lock()
            .unwrap()
            .entry(message.to.clone())
            .or_insert(0) += 1;

        {
            let mut remaining = self.scripted_failures.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(MailerError::send_failed("scripted failure"));
            }
        }

        if self
            .failing_addresses
            .lock()
            .unwrap()
            .iter()
            .any(|address| address == &message.to)
        {
            return Err(MailerError::send_failed(format!(
                "address rejected: {}",
                message.to
            )));
        }

        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// 记录所有上报的 reporter
#[derive(Debug, Clone, Default)]
pub struct RecordingOutcomeReporter {
    reports: Arc<Mutex<Vec<(UnitOfWork, UnitOutcome)>>>,
}

impl RecordingOutcomeReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(UnitOfWork, UnitOutcome)> {
        self.reports.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }

    pub fn success_count(&self) -> usize {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, outcome)| outcome.is_success())
            .count()
    }

    pub fn failure_count(&self) -> usize {
        self.count() - self.success_count()
    }
}

#[async_trait]
impl OutcomeReporter for RecordingOutcomeReporter {
    async fn report(&self, unit: &UnitOfWork, outcome: &UnitOutcome) -> MailerResult<()> {
        self.reports
            .lock()
            .unwrap()
            .push((unit.clone(), outcome.clone()));
        Ok(())
    }
}

/// 只记录不执行的队列
#[derive(Debug, Clone, Default)]
pub struct RecordingUnitQueue {
    units: Arc<Mutex<Vec<UnitOfWork>>>,
    closed: Arc<Mutex<bool>>,
    capacity: Arc<Mutex<Option<usize>>>,
}

impl RecordingUnitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn units(&self) -> Vec<UnitOfWork> {
        self.units.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.units.lock().unwrap().len()
    }

    /// 模拟关闭中的队列，之后的入队返回 `QueueClosed`
    pub fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }

    /// 再接受 `accepted` 个单元后关闭
    pub fn close_after(&self, accepted: usize) {
        *self.capacity.lock().unwrap() = Some(self.count() + accepted);
    }
}

#[async_trait]
impl UnitQueue for RecordingUnitQueue {
    async fn enqueue(&self, unit: UnitOfWork) -> MailerResult<()> {
        if *self.closed.lock().unwrap() {
            return Err(MailerError::QueueClosed);
        }
        let mut units = self.units.lock().unwrap();
        if let Some(capacity) = *self.capacity.lock().unwrap() {
            if units.len() >= capacity {
                *self.closed.lock().unwrap() = true;
                return Err(MailerError::QueueClosed);
            }
        }
        units.push(unit);
        Ok(())
    }
}
