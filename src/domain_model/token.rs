use crate::domain_model::{RawSecret, RecordId};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const DELIMITER: u8 = b':';

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(pub String);

/// Bearer refresh credential: `base64(record_id ":" raw_secret)`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

impl RefreshToken {
    pub fn compose(record_id: &RecordId, secret: &RawSecret) -> Self {
        let mut combined = record_id.as_str().as_bytes().to_vec();
        combined.push(DELIMITER);
        combined.extend_from_slice(secret.as_bytes());
        RefreshToken(STANDARD.encode(combined))
    }

    /// Splits at the first delimiter. The record id must be non-empty UTF-8;
    /// everything after the delimiter is the secret, byte for byte.
    pub fn split(&self) -> Option<(RecordId, RawSecret)> {
        let bytes = STANDARD.decode(&self.0).ok()?;
        let at = bytes.iter().position(|&b| b == DELIMITER)?;
        let (record_id, secret) = (&bytes[..at], &bytes[at + 1..]);
        if record_id.is_empty() || secret.is_empty() {
            return None;
        }
        let record_id = std::str::from_utf8(record_id).ok()?;
        Some((RecordId(record_id.to_owned()), RawSecret(secret.to_vec())))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(raw: &str) -> RefreshToken {
        RefreshToken(STANDARD.encode(raw))
    }

    #[test]
    fn compose_then_split_recovers_parts() {
        let id = RecordId::generate();
        let secret = RawSecret::generate();
        let token = RefreshToken::compose(&id, &secret);
        assert_eq!(token.split(), Some((id, secret)));
    }

    #[test]
    fn split_rejects_bad_shapes() {
        assert_eq!(RefreshToken("!!".to_string()).split(), None);
        assert_eq!(encoded("bad-token").split(), None);
        assert_eq!(encoded(":secret").split(), None);
        assert_eq!(encoded("record:").split(), None);
        assert_eq!(RefreshToken(STANDARD.encode([0xff, b':', 0xfe])).split(), None);
        assert_eq!(RefreshToken(format!(" {}", STANDARD.encode("a:b"))).split(), None);
    }

    #[test]
    fn split_keeps_everything_after_the_first_delimiter() {
        let (id, secret) = encoded("a:b:c").split().unwrap();
        assert_eq!(id, RecordId("a".to_string()));
        assert_eq!(secret, RawSecret(b"b:c".to_vec()));

        let (_, secret) = RefreshToken(STANDARD.encode([b'a', b':', 0xff, 0xfe]))
            .split()
            .unwrap();
        assert_eq!(secret.as_bytes(), &[0xff, 0xfe]);
    }
}
