use crate::domain_port::{Notifier, NotifyError};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::InvalidConfig(format!("Invalid from: {}", e)))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| NotifyError::InvalidConfig(e.to_string()))?
            .port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
            from,
        })
    }
}

fn build_message(
    from: &Mailbox,
    recipients: &[String],
    subject: &str,
    body: &str,
) -> Result<Message, NotifyError> {
    if recipients.is_empty() {
        return Err(NotifyError::InvalidConfig("no recipients".into()));
    }
    let mut builder = Message::builder()
        .from(from.clone())
        .subject(subject)
        .header(ContentType::TEXT_PLAIN);
    for to in recipients {
        let mailbox = to
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::InvalidConfig(format!("Invalid to {}: {}", to, e)))?;
        builder = builder.to(mailbox);
    }
    builder
        .body(body.to_owned())
        .map_err(|e| NotifyError::SendFailed(e.to_string()))
}

#[async_trait::async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError> {
        let message = build_message(&self.from, recipients, subject, body)?;
        self.mailer
            .send(message)
            .await
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;
        Ok(())
    }
}
