#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid notifier config: {0}")]
    InvalidConfig(String),
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("timed out")]
    Timeout,
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipients: &[String], subject: &str, body: &str)
    -> Result<(), NotifyError>;
}
