//! Argon2 哈希实现

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use idp_errors::{AppError, AppResult};

use crate::domain::secret::{HashedSecret, SecretHasher};

#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> AppResult<HashedSecret> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Failed to hash secret: {}", e)))?
            .to_string();

        Ok(HashedSecret(hash))
    }

    fn verify(&self, plain: &str, hashed: &HashedSecret) -> AppResult<bool> {
        if hashed.is_empty() {
            return Ok(false);
        }

        let parsed = PasswordHash::new(hashed.as_str())
            .map_err(|e| AppError::internal(format!("Invalid secret hash: {}", e)))?;

        Ok(self.argon2.verify_password(plain.as_bytes(), &parsed).is_ok())
    }
}
