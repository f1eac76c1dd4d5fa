use crate::application_port::*;
use crate::domain_model::*;
use chrono::{Duration, Utc};
use std::net::IpAddr;

#[derive(Debug, Default)]
pub struct FakeTokenService;

impl FakeTokenService {
    pub fn new() -> Self {
        Self
    }
}

// Deterministic tokens for wiring clients without a store.
// Nothing is persisted, so refresh tokens are reusable.
#[async_trait::async_trait]
impl TokenService for FakeTokenService {
    async fn issue_token_pair(
        &self,
        subject: SubjectId,
        _client_ip: IpAddr,
    ) -> Result<TokenPair, TokenError> {
        Ok(get_fake_pair(subject.as_str()))
    }

    async fn refresh(
        &self,
        refresh_token: &RefreshToken,
        _client_ip: IpAddr,
    ) -> Result<TokenPair, TokenError> {
        match refresh_token.0.strip_prefix("fake-refresh-token:") {
            Some(subject) if !subject.is_empty() => Ok(get_fake_pair(subject)),
            _ => Err(TokenError::MalformedToken),
        }
    }

    async fn verify_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<VerifiedAccess, TokenError> {
        let subject = token
            .0
            .strip_prefix("fake-access-token:")
            .ok_or(TokenError::InvalidCredential)?;
        Ok(VerifiedAccess {
            subject: SubjectId::new(subject),
            client_ip: IpAddr::from([127, 0, 0, 1]),
            record_id: format!("fake:{}", subject),
            expires_at: Utc::now() + Duration::minutes(15),
        })
    }
}

fn get_fake_pair(subject: &str) -> TokenPair {
    let now = Utc::now();
    TokenPair {
        access_token: AccessToken(format!("fake-access-token:{}", subject)),
        access_token_expires_at: now + Duration::minutes(15),
        refresh_token: RefreshToken(format!("fake-refresh-token:{}", subject)),
        refresh_token_expires_at: now + Duration::days(7),
    }
}
