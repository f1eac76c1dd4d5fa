use crate::domain_model::SubjectId;
use argon2::password_hash::rand_core::{OsRng, RngCore};
use std::fmt;
use std::net::IpAddr;

const RECORD_ID_BYTES: usize = 16;
const SECRET_BYTES: usize = 32;

/// Key of a refresh record. 128 random bits, hex encoded.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; RECORD_ID_BYTES];
        OsRng.fill_bytes(&mut bytes);
        RecordId(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The raw half of a refresh token. Only its hash is ever persisted.
///
/// Generated secrets are hex text, but presented ones are compared as the
/// exact bytes that followed the delimiter.
#[derive(Clone, Eq, PartialEq)]
pub struct RawSecret(pub Vec<u8>);

impl RawSecret {
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        RawSecret(hex::encode(bytes).into_bytes())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for RawSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawSecret(<redacted>)")
    }
}

/// Pending refresh state, stored under its [`RecordId`] until consumed or expired.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RefreshRecord {
    /// PHC string of the secret's Argon2 hash.
    pub verifier: String,
    pub client_ip: IpAddr,
    pub subject: SubjectId,
}
