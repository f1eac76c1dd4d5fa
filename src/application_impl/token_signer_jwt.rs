use crate::application_port::{TokenError, TokenSigner, VerifiedAccess};
use crate::domain_model::*;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub signing_key: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String,
    ip: String,
    rjti: String, // refresh record this token was issued with
    jti: String,
    iss: String,
    aud: String,
    iat: i64,
    nbf: i64,
    exp: i64,
}

pub struct JwtHs512Signer {
    cfg: JwtConfig,
}

impl JwtHs512Signer {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs512Signer { cfg }
    }

    fn validation(&self) -> Validation {
        let mut v = Validation::new(Algorithm::HS512);
        v.validate_exp = true;
        v.validate_nbf = true;
        v.set_audience(&[self.cfg.audience.clone()]);
        v.set_issuer(&[self.cfg.issuer.clone()]);
        v.set_required_spec_claims(&["exp", "nbf", "sub", "iss", "aud"]);
        v
    }
}

impl TokenSigner for JwtHs512Signer {
    fn sign_access(
        &self,
        subject: &SubjectId,
        client_ip: IpAddr,
        record_id: &RecordId,
    ) -> Result<(AccessToken, DateTime<Utc>), TokenError> {
        if self.cfg.signing_key.is_empty() {
            return Err(TokenError::SigningFailure("signing key is empty".to_string()));
        }
        let ttl = chrono::Duration::from_std(self.cfg.access_ttl)
            .map_err(|e| TokenError::SigningFailure(format!("access ttl: {}", e)))?;
        let iat_dt = Utc::now();
        let exp_dt = iat_dt + ttl;
        let claims = AccessClaims {
            sub: subject.to_string(),
            ip: client_ip.to_string(),
            rjti: record_id.to_string(),
            jti: record_id.to_string(),
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
            iat: iat_dt.timestamp(),
            nbf: iat_dt.timestamp(),
            exp: exp_dt.timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(&self.cfg.signing_key),
        )
        .map_err(|e| TokenError::SigningFailure(e.to_string()))?;
        Ok((AccessToken(token), exp_dt))
    }

    fn verify_access(&self, token: &AccessToken) -> Result<VerifiedAccess, TokenError> {
        let data = decode::<AccessClaims>(
            &token.0,
            &DecodingKey::from_secret(&self.cfg.signing_key),
            &self.validation(),
        )
        .map_err(|_| TokenError::InvalidCredential)?;
        let claims = data.claims;
        let client_ip = claims
            .ip
            .parse::<IpAddr>()
            .map_err(|_| TokenError::InvalidCredential)?;
        let expires_at =
            DateTime::from_timestamp(claims.exp, 0).ok_or(TokenError::InvalidCredential)?;
        Ok(VerifiedAccess {
            subject: SubjectId(claims.sub),
            client_ip,
            record_id: claims.rjti,
            expires_at,
        })
    }
}
