use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::IpAddr;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    MalformedToken,
    #[error("token unknown or expired")]
    UnknownOrExpiredToken,
    #[error("invalid credential")]
    InvalidCredential,
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
    #[error("signing failure: {0}")]
    SigningFailure(String),
    #[error("notification failure: {0}")]
    NotificationFailure(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Claims recovered from a valid access token.
#[derive(Debug, Clone, Serialize)]
pub struct VerifiedAccess {
    pub subject: SubjectId,
    pub client_ip: IpAddr,
    pub record_id: String,
    pub expires_at: DateTime<Utc>,
}

pub trait TokenSigner: Send + Sync {
    fn sign_access(
        &self,
        subject: &SubjectId,
        client_ip: IpAddr,
        record_id: &RecordId,
    ) -> Result<(AccessToken, DateTime<Utc>), TokenError>;
    fn verify_access(&self, token: &AccessToken) -> Result<VerifiedAccess, TokenError>;
}

#[async_trait::async_trait]
pub trait SecretHasher: Send + Sync {
    async fn hash_secret(&self, secret: &RawSecret) -> Result<String, TokenError>;
    async fn verify_secret(&self, secret: &RawSecret, verifier: &str)
    -> Result<bool, TokenError>;
}

/// Hands session alerts off for delivery. Must never block or fail the caller.
pub trait AlertSink: Send + Sync {
    fn dispatch(&self, alert: SessionAlert);
}

#[async_trait::async_trait]
pub trait TokenService: Send + Sync {
    async fn issue_token_pair(
        &self,
        subject: SubjectId,
        client_ip: IpAddr,
    ) -> Result<TokenPair, TokenError>;
    async fn refresh(
        &self,
        refresh_token: &RefreshToken,
        client_ip: IpAddr,
    ) -> Result<TokenPair, TokenError>;
    async fn verify_access_token(&self, token: &AccessToken)
    -> Result<VerifiedAccess, TokenError>;
}
