use crate::application_port::{SecretHasher, TokenError};
use crate::domain_model::RawSecret;
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

#[derive(Debug, Clone)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Argon2id hashing, run on the blocking pool.
pub struct Argon2SecretHasher {
    argon2: Argon2<'static>,
}

impl Argon2SecretHasher {
    pub fn new(cost: &HashCost) -> Result<Self, TokenError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| TokenError::Internal(format!("argon2 params: {}", e)))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

#[async_trait::async_trait]
impl SecretHasher for Argon2SecretHasher {
    async fn hash_secret(&self, secret: &RawSecret) -> Result<String, TokenError> {
        let argon2 = self.argon2.clone();
        let secret = secret.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(secret.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| TokenError::Internal(format!("hash error: {}", e)))
        })
        .await
        .map_err(|e| TokenError::Internal(e.to_string()))?
    }

    async fn verify_secret(
        &self,
        secret: &RawSecret,
        verifier: &str,
    ) -> Result<bool, TokenError> {
        let argon2 = self.argon2.clone();
        let secret = secret.clone();
        let verifier = verifier.to_owned();
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&verifier)
                .map_err(|e| TokenError::Internal(format!("invalid PHC hash: {}", e)))?;
            match argon2.verify_password(secret.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(TokenError::Internal(format!("verify error: {}", e))),
            }
        })
        .await
        .map_err(|e| TokenError::Internal(e.to_string()))?
    }
}
