use std::time::Duration;

use mailer_config::WorkerConfig;
use mailer_domain::{UnitOfWork, UnitOutcome};
use tracing::{debug, warn};

use crate::executor::UnitExecutor;

/// 单元级重试策略
///
/// 默认 3 次尝试、不等待；`backoff_base_ms > 0` 时在两次尝试之间按指数退避等待，
/// 间隔不超过 `max_backoff_ms`。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base_ms: u64,
    backoff_multiplier: f64,
    max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&WorkerConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base_ms: 0,
            backoff_multiplier: 2.0,
            max_backoff_ms: 0,
        }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_base_ms: config.backoff_base_ms,
            backoff_multiplier: config.backoff_multiplier,
            max_backoff_ms: config.max_backoff_ms,
        }
    }

    pub fn with_backoff(mut self, base_ms: u64, multiplier: f64, max_ms: u64) -> Self {
        self.backoff_base_ms = base_ms;
        self.backoff_multiplier = multiplier;
        self.max_backoff_ms = max_ms;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 第 `failed_attempt` 次失败之后、下一次尝试之前的等待时间
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        if self.backoff_base_ms == 0 {
            return Duration::ZERO;
        }

        let exponent = failed_attempt.saturating_sub(1) as i32;
        let interval = self.backoff_base_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = interval.min(self.max_backoff_ms.max(self.backoff_base_ms) as f64);

        Duration::from_millis(capped as u64)
    }

    /// 执行直到首次成功或次数用尽，只产生一个结果
    pub async fn run(&self, executor: &UnitExecutor, unit: &UnitOfWork) -> UnitOutcome {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match executor.execute(unit, attempt).await {
                Ok(()) => {
                    debug!(
                        "发送成功: mail_job_id={}, recipient_id={}, attempt={}",
                        unit.mail_job_id, unit.recipient.id, attempt
                    );
                    return UnitOutcome::Succeeded { attempts: attempt };
                }
                Err(e) => {
                    warn!(
                        "发送失败: mail_job_id={}, recipient_id={}, attempt={}/{}, error={}",
                        unit.mail_job_id, unit.recipient.id, attempt, self.max_attempts, e
                    );
                    last_error = e.to_string();

                    if !e.is_retryable() {
                        return UnitOutcome::Failed {
                            attempts: attempt,
                            last_error,
                        };
                    }

                    if attempt < self.max_attempts {
                        let delay = self.delay_for(attempt);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        UnitOutcome::Failed {
            attempts: self.max_attempts,
            last_error,
        }
    }
}
