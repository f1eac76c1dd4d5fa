use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{RevocationStore, StoreError};
use crate::logger::*;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TokenPolicy {
    pub refresh_ttl: Duration,
    /// Upper bound on every single revocation store call.
    pub store_timeout: Duration,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            store_timeout: Duration::from_secs(2),
        }
    }
}

pub struct RealTokenService {
    store: Arc<dyn RevocationStore>,
    hasher: Arc<dyn SecretHasher>,
    signer: Arc<dyn TokenSigner>,
    alerts: Arc<dyn AlertSink>,
    policy: TokenPolicy,
}

impl RealTokenService {
    pub fn new(
        store: Arc<dyn RevocationStore>,
        hasher: Arc<dyn SecretHasher>,
        signer: Arc<dyn TokenSigner>,
        alerts: Arc<dyn AlertSink>,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            store,
            hasher,
            signer,
            alerts,
            policy,
        }
    }

    async fn bounded<T>(
        &self,
        op: &str,
        id: &RecordId,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, TokenError> {
        let err = match tokio::time::timeout(self.policy.store_timeout, call).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => StoreError::Timeout,
        };
        error!(record_id = %id, "revocation store {} failed: {}", op, err);
        Err(TokenError::PersistenceFailure(format!("{} {}: {}", op, id, err)))
    }

    fn refresh_expiry(&self) -> Result<DateTime<Utc>, TokenError> {
        let ttl = chrono::Duration::from_std(self.policy.refresh_ttl)
            .map_err(|e| TokenError::Internal(format!("refresh ttl: {}", e)))?;
        Ok(Utc::now() + ttl)
    }

    async fn issue(&self, subject: SubjectId, client_ip: IpAddr) -> Result<TokenPair, TokenError> {
        let record_id = RecordId::generate();
        let secret = RawSecret::generate();
        let refresh_token_expires_at = self.refresh_expiry()?;

        let record = RefreshRecord {
            verifier: self.hasher.hash_secret(&secret).await?,
            client_ip,
            subject,
        };
        self.bounded(
            "save",
            &record_id,
            self.store.save(&record_id, &record, self.policy.refresh_ttl),
        )
        .await?;

        // Sign strictly after the record is durable; on failure the record goes.
        let (access_token, access_token_expires_at) =
            match self
                .signer
                .sign_access(&record.subject, client_ip, &record_id)
            {
                Ok(signed) => signed,
                Err(e) => {
                    error!(record_id = %record_id, "signing access token failed: {}", e);
                    if let Err(cleanup) = self
                        .bounded("delete", &record_id, self.store.delete(&record_id))
                        .await
                    {
                        warn!("unsigned record left to expire: {}", cleanup);
                    }
                    return Err(e);
                }
            };

        debug!(record_id = %record_id, subject = %record.subject, "issued token pair");
        Ok(TokenPair {
            access_token,
            refresh_token: RefreshToken::compose(&record_id, &secret),
            access_token_expires_at,
            refresh_token_expires_at,
        })
    }
}

#[async_trait::async_trait]
impl TokenService for RealTokenService {
    async fn issue_token_pair(
        &self,
        subject: SubjectId,
        client_ip: IpAddr,
    ) -> Result<TokenPair, TokenError> {
        self.issue(subject, client_ip).await
    }

    async fn refresh(
        &self,
        refresh_token: &RefreshToken,
        client_ip: IpAddr,
    ) -> Result<TokenPair, TokenError> {
        let (record_id, secret) = refresh_token.split().ok_or(TokenError::MalformedToken)?;

        let record = self
            .bounded("get", &record_id, self.store.get(&record_id))
            .await?
            .ok_or(TokenError::UnknownOrExpiredToken)?;

        if !self.hasher.verify_secret(&secret, &record.verifier).await? {
            debug!(record_id = %record_id, "refresh secret mismatch");
            return Err(TokenError::InvalidCredential);
        }

        // Single use: whoever removes the key owns the rotation.
        if !self
            .bounded("delete", &record_id, self.store.delete(&record_id))
            .await?
        {
            debug!(record_id = %record_id, "record consumed concurrently");
            return Err(TokenError::UnknownOrExpiredToken);
        }

        if record.client_ip != client_ip {
            warn!(
                record_id = %record_id,
                subject = %record.subject,
                "session ip changed from {} to {}",
                record.client_ip,
                client_ip
            );
            self.alerts.dispatch(SessionAlert {
                subject: record.subject.clone(),
                previous_ip: record.client_ip,
                current_ip: client_ip,
            });
        }

        let pair = self.issue(record.subject, client_ip).await?;
        info!(consumed = %record_id, "rotated refresh token");
        Ok(pair)
    }

    async fn verify_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<VerifiedAccess, TokenError> {
        self.signer.verify_access(token)
    }
}
