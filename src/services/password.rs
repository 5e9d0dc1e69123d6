use bcrypt::{hash, verify, DEFAULT_COST};

use crate::utils::errors::AppResult;

/// One-way password function.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> AppResult<String>;

    fn verify(&self, password: &str, password_hash: &str) -> AppResult<bool>;
}

pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> AppResult<String> {
        Ok(hash(password, self.cost)?)
    }

    fn verify(&self, password: &str, password_hash: &str) -> AppResult<bool> {
        // Rows imported from elsewhere may not hold a bcrypt hash at all.
        match verify(password, password_hash) {
            Ok(matches) => Ok(matches),
            Err(bcrypt::BcryptError::InvalidHash(_))
            | Err(bcrypt::BcryptError::InvalidPrefix(_))
            | Err(bcrypt::BcryptError::InvalidBase64(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
