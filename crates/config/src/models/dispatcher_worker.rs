use crate::validation::{ConfigValidator, ValidationUtils};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// 单次批量发送允许的最大收件人数
    pub max_batch_size: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 10_000,
        }
    }
}

impl ConfigValidator for DispatcherConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_count(self.max_batch_size, "dispatcher.max_batch_size", 1_000_000)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub worker_count: usize,
    /// 每个发送单元的最大尝试次数（含首次）
    pub max_attempts: u32,
    /// 开启失败模拟时，每次尝试注入失败的概率
    pub failure_probability: f64,
    /// 重试退避基数，0 表示不等待
    pub backoff_base_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_count: 8,
            max_attempts: 3,
            failure_probability: 0.3,
            backoff_base_ms: 0,
            backoff_multiplier: 2.0,
            max_backoff_ms: 5_000,
        }
    }
}

impl ConfigValidator for WorkerConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_count(self.worker_count, "worker.worker_count", 1000)?;
        ValidationUtils::validate_count(self.max_attempts as usize, "worker.max_attempts", 20)?;
        ValidationUtils::validate_probability(
            self.failure_probability,
            "worker.failure_probability",
        )?;

        if self.backoff_multiplier < 1.0 {
            return Err(crate::ConfigError::Validation(
                "worker.backoff_multiplier must be at least 1.0".to_string(),
            ));
        }
        if self.backoff_base_ms > self.max_backoff_ms {
            return Err(crate::ConfigError::Validation(
                "worker.backoff_base_ms must be less than or equal to max_backoff_ms".to_string(),
            ));
        }

        Ok(())
    }
}
