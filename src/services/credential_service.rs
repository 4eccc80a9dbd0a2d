use crate::config::CredentialConfig;
use crate::domain::message::PasswordDigest;
use crate::error::{AppError, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::{RngCore, rngs::OsRng};
use std::sync::Arc;

/// One-way salted password hashing with Argon2id.
///
/// Both operations run on the blocking pool so a slow hash never stalls the
/// request executor. Verification relies on the argon2 crate's constant-time
/// output comparison.
#[derive(Clone, Debug)]
pub struct CredentialService {
    params: Params,
    decoy: Arc<PasswordDigest>,
}

impl CredentialService {
    /// Builds the engine and precomputes the decoy hash used to equalize timing
    /// for lookups that miss.
    ///
    /// # Errors
    /// Returns `AppError::Internal` if the Argon2 parameters are invalid.
    pub fn new(config: &CredentialConfig) -> Result<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None).map_err(|e| {
            tracing::error!(error = %e, "Invalid Argon2 parameters");
            AppError::Internal
        })?;

        let mut filler = [0u8; 32];
        OsRng.fill_bytes(&mut filler);
        let decoy = hash_with(&params, &filler)?;

        Ok(Self { params, decoy: Arc::new(decoy) })
    }

    #[tracing::instrument(level = "debug", err, skip(self, plaintext))]
    pub async fn hash(&self, plaintext: &str) -> Result<PasswordDigest> {
        let plaintext = plaintext.to_string();
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || hash_with(&params, plaintext.as_bytes()))
            .await
            .map_err(|_| AppError::Internal)?
    }

    /// Returns whether `digest` was produced from `plaintext`.
    ///
    /// A malformed digest never matches.
    #[tracing::instrument(level = "debug", err, skip(self, plaintext, digest))]
    pub async fn compare(&self, plaintext: &str, digest: &PasswordDigest) -> Result<bool> {
        let plaintext = plaintext.to_string();
        let digest = digest.clone();
        tokio::task::spawn_blocking(move || verify(plaintext.as_bytes(), &digest))
            .await
            .map_err(|_| AppError::Internal)
    }

    /// Spends the same work as a real comparison against a hash nobody knows the input of.
    pub async fn compare_decoy(&self, plaintext: &str) {
        let decoy = Arc::clone(&self.decoy);
        let _ = self.compare(plaintext, &decoy).await;
    }
}

fn hash_with(params: &Params, password: &[u8]) -> Result<PasswordDigest> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone());
    argon2
        .hash_password(password, &salt)
        .map(|h| PasswordDigest::new(h.to_string()))
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            AppError::Internal
        })
}

fn verify(password: &[u8], digest: &PasswordDigest) -> bool {
    let Ok(parsed) = PasswordHash::new(digest.as_str()) else {
        tracing::warn!("Stored password hash is malformed");
        return false;
    };
    // Cost parameters come from the PHC string, not from the current config.
    Argon2::default().verify_password(password, &parsed).is_ok()
}
