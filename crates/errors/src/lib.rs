use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),
    #[error("邮件任务未找到: {id}")]
    MailJobNotFound { id: i64 },
    #[error("收件人数量不足: 请求 {requested} 个，可用 {available} 个")]
    InsufficientRecipients { requested: u64, available: u64 },
    #[error("邮件发送失败: {0}")]
    SendFailed(String),
    #[error("模拟发送失败")]
    SimulatedFailure,
    #[error("任务队列已关闭")]
    QueueClosed,
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("网络错误: {0}")]
    Network(String),
    #[error("数据验证失败: {0}")]
    ValidationError(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type MailerResult<T> = Result<T, MailerError>;

impl MailerError {
    pub fn database_error<S: Into<String>>(msg: S) -> Self {
        Self::DatabaseOperation(msg.into())
    }
    pub fn mail_job_not_found(id: i64) -> Self {
        Self::MailJobNotFound { id }
    }
    pub fn insufficient_recipients(requested: u64, available: u64) -> Self {
        Self::InsufficientRecipients {
            requested,
            available,
        }
    }
    pub fn send_failed<S: Into<String>>(msg: S) -> Self {
        Self::SendFailed(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn validation_error<S: Into<String>>(msg: S) -> Self {
        Self::ValidationError(msg.into())
    }
    /// 不变量被破坏，只记录日志，不重试
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MailerError::MailJobNotFound { .. }
                | MailerError::Internal(_)
                | MailerError::Configuration(_)
        )
    }
    /// 单次发送尝试的失败，可由重试策略吸收
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MailerError::SendFailed(_) | MailerError::SimulatedFailure | MailerError::Network(_)
        )
    }
    pub fn user_message(&self) -> &str {
        match self {
            MailerError::MailJobNotFound { .. } => "请求的邮件任务不存在",
            MailerError::InsufficientRecipients { .. } => "可用收件人不足，请减少发送数量",
            MailerError::ValidationError(_) => "输入数据验证失败",
            MailerError::QueueClosed => "系统正在关闭，请稍后重试",
            _ => "系统繁忙，请稍后重试",
        }
    }
}

impl From<serde_json::Error> for MailerError {
    fn from(err: serde_json::Error) -> Self {
        MailerError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for MailerError {
    fn from(err: anyhow::Error) -> Self {
        MailerError::Internal(err.to_string())
    }
}
