use crate::domain_port::{Notifier, NotifyError};
use crate::logger::*;

/// Writes alerts to the log instead of delivering them.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError> {
        info!(?recipients, subject, body, "notification");
        Ok(())
    }
}
