use crate::application_port::{AlertSink, TokenError};
use crate::domain_model::SessionAlert;
use crate::domain_port::{Notifier, NotifyError};
use crate::logger::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub recipients: Vec<String>,
    pub timeout: Duration,
    pub queue_capacity: usize,
}

/// Request-side handle: enqueues alerts without waiting for delivery.
#[derive(Clone)]
pub struct AlertDispatcher {
    queue: mpsc::Sender<SessionAlert>,
}

impl AlertSink for AlertDispatcher {
    fn dispatch(&self, alert: SessionAlert) {
        match self.queue.try_send(alert) {
            Ok(()) => {}
            Err(TrySendError::Full(alert)) => {
                warn!(subject = %alert.subject, "alert queue full, dropping session alert");
            }
            Err(TrySendError::Closed(alert)) => {
                warn!(subject = %alert.subject, "alert worker stopped, dropping session alert");
            }
        }
    }
}

/// Drains the alert queue into the notifier, one bounded delivery at a time.
pub struct AlertWorker {
    queue: mpsc::Receiver<SessionAlert>,
    notifier: Arc<dyn Notifier>,
    recipients: Vec<String>,
    timeout: Duration,
    cancellation_token: CancellationToken,
}

pub fn alert_channel(
    notifier: Arc<dyn Notifier>,
    config: AlertConfig,
    cancellation_token: CancellationToken,
) -> (AlertDispatcher, AlertWorker) {
    let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
    let worker = AlertWorker {
        queue: rx,
        notifier,
        recipients: config.recipients,
        timeout: config.timeout,
        cancellation_token,
    };
    (AlertDispatcher { queue: tx }, worker)
}

impl AlertWorker {
    async fn deliver(&self, alert: &SessionAlert) -> Result<(), TokenError> {
        let body = alert.body();
        let send = self.notifier.notify(&self.recipients, alert.title(), &body);
        let err = match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e,
            Err(_) => NotifyError::Timeout,
        };
        Err(TokenError::NotificationFailure(err.to_string()))
    }

    pub async fn run(mut self) {
        let cancel = self.cancellation_token.clone();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = self.queue.recv() => next,
            };
            let Some(alert) = next else {
                break;
            };
            match self.deliver(&alert).await {
                Ok(()) => debug!(subject = %alert.subject, "session alert delivered"),
                Err(e) => warn!(subject = %alert.subject, "session alert not delivered: {}", e),
            }
        }
        info!("alert worker shutting down...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::SubjectId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ChannelNotifier(mpsc::UnboundedSender<(Vec<String>, String, String)>);

    #[async_trait::async_trait]
    impl Notifier for ChannelNotifier {
        async fn notify(
            &self,
            recipients: &[String],
            subject: &str,
            body: &str,
        ) -> Result<(), NotifyError> {
            let _ = self
                .0
                .send((recipients.to_vec(), subject.to_owned(), body.to_owned()));
            Ok(())
        }
    }

    /// First call hangs forever, later calls fail.
    #[derive(Default)]
    struct BrokenNotifier(AtomicUsize);

    #[async_trait::async_trait]
    impl Notifier for BrokenNotifier {
        async fn notify(&self, _: &[String], _: &str, _: &str) -> Result<(), NotifyError> {
            if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
                std::future::pending::<()>().await;
            }
            Err(NotifyError::SendFailed("550 mailbox unavailable".to_string()))
        }
    }

    fn alert(new_ip: &str) -> SessionAlert {
        SessionAlert {
            subject: SubjectId::new("user-1"),
            previous_ip: "10.0.0.1".parse().unwrap(),
            current_ip: new_ip.parse().unwrap(),
        }
    }

    fn config(capacity: usize) -> AlertConfig {
        AlertConfig {
            recipients: vec!["security@example.com".to_string()],
            timeout: Duration::from_millis(50),
            queue_capacity: capacity,
        }
    }

    #[tokio::test]
    async fn delivers_alert_text_to_configured_recipients() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let (dispatcher, worker) =
            alert_channel(Arc::new(ChannelNotifier(tx)), config(8), cancel.clone());
        let handle = tokio::spawn(worker.run());

        dispatcher.dispatch(alert("10.0.0.9"));
        let (recipients, subject, body) = rx.recv().await.unwrap();
        assert_eq!(recipients, vec!["security@example.com".to_string()]);
        assert_eq!(subject, "Warning: IP address changed");
        assert_eq!(body, "Your session IP changed from 10.0.0.1 to 10.0.0.9");

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn failing_notifier_does_not_stop_the_worker() {
        let notifier = Arc::new(BrokenNotifier::default());
        let cancel = CancellationToken::new();
        let (dispatcher, worker) = alert_channel(notifier.clone(), config(8), cancel.clone());
        let handle = tokio::spawn(worker.run());

        dispatcher.dispatch(alert("10.0.0.2"));
        dispatcher.dispatch(alert("10.0.0.3"));
        drop(dispatcher);

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notifier.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn full_or_closed_queue_drops_without_blocking() {
        let cancel = CancellationToken::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let (dispatcher, worker) =
            alert_channel(Arc::new(ChannelNotifier(tx)), config(1), cancel);
        dispatcher.dispatch(alert("10.0.0.2"));
        dispatcher.dispatch(alert("10.0.0.3"));
        drop(worker);
        dispatcher.dispatch(alert("10.0.0.4"));
    }
}
