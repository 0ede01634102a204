//! One-way password hashing (Argon2id) and constant-time verification.

use std::sync::{Arc, OnceLock};

use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand::TryRngCore;
use rand::rngs::OsRng;
use thiserror::Error;

/// The only reason ever reported for a failed credential check.
///
/// Unknown email and wrong password share it so a caller cannot tell which
/// factor was wrong.
pub const CREDENTIALS_INCORRECT: &str = "email or password is incorrect";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("entropy source failure: {0}")]
    Entropy(String),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    /// Memory size in KiB (`m`).
    pub memory_kib: u32,
    /// Number of passes over memory (`t`).
    pub iterations: u32,
    /// Degree of parallelism (`p`).
    pub parallelism: u32,
}

impl Default for HashCost {
    /// 64 MiB, 3 passes: well above the work of bcrypt at cost 14.
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 1,
        }
    }
}

/// Outcome of [`CredentialHasher::verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Match,
    Mismatch,
}

impl Verification {
    pub fn is_match(self) -> bool {
        self == Verification::Match
    }

    pub fn reason(self) -> Option<&'static str> {
        match self {
            Verification::Match => None,
            Verification::Mismatch => Some(CREDENTIALS_INCORRECT),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CredentialHasher {
    cost: HashCost,
    /// Digest of a throwaway secret at `cost`, built on first use.
    pub(crate) decoy: Arc<OnceLock<Option<String>>>,
}

impl CredentialHasher {
    pub fn new(cost: HashCost) -> Self {
        Self {
            cost,
            decoy: Arc::default(),
        }
    }

    pub fn cost(&self) -> HashCost {
        self.cost
    }

    /// Hash `plaintext` into a PHC string with a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        let params = Params::new(
            self.cost.memory_kib,
            self.cost.iterations,
            self.cost.parallelism,
            None,
        )
        .map_err(|e| HashError::Hash(e.to_string()))?;

        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(plaintext.as_bytes(), &salt()?)
            .map(|h| h.to_string())
            .map_err(|e| HashError::Hash(e.to_string()))
    }

    /// Compare `candidate` against a stored PHC string.
    ///
    /// Cost parameters are read from `hashed`, so digests produced under an
    /// older [`HashCost`] keep verifying. A corrupt or foreign digest is a
    /// mismatch, never an error.
    pub fn verify(&self, hashed: &str, candidate: &str) -> Verification {
        let Ok(parsed) = PasswordHash::new(hashed) else {
            return Verification::Mismatch;
        };
        match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
            Ok(()) => Verification::Match,
            Err(_) => Verification::Mismatch,
        }
    }

    /// Run a full verification with no stored digest to check against.
    ///
    /// Spends the same Argon2 work as [`verify`](Self::verify) at the current
    /// cost and always reports a mismatch.
    pub fn verify_decoy(&self, candidate: &str) -> Verification {
        let decoy = self
            .decoy
            .get_or_init(|| self.hash("gatehouse-decoy-credential").ok());
        if let Some(hashed) = decoy {
            let _ = self.verify(hashed, candidate);
        }
        Verification::Mismatch
    }
}

fn salt() -> Result<SaltString, HashError> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| HashError::Entropy(e.to_string()))?;
    SaltString::encode_b64(&bytes).map_err(|e| HashError::Hash(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> CredentialHasher {
        CredentialHasher::new(HashCost {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
    }

    #[test]
    fn hash_verifies_and_differs_from_plaintext() {
        let hasher = cheap();
        let hashed = hasher.hash("secret").unwrap();

        assert_ne!(hashed, "secret");
        assert!(hashed.starts_with("$argon2id$"));
        assert_eq!(hasher.verify(&hashed, "secret"), Verification::Match);
    }

    #[test]
    fn wrong_password_is_a_generic_mismatch() {
        let hasher = cheap();
        let hashed = hasher.hash("secret").unwrap();

        let verdict = hasher.verify(&hashed, "Secret");
        assert!(!verdict.is_match());
        assert_eq!(verdict.reason(), Some(CREDENTIALS_INCORRECT));
    }

    #[test]
    fn salts_are_unique() {
        let hasher = cheap();
        assert_ne!(hasher.hash("secret").unwrap(), hasher.hash("secret").unwrap());
    }

    #[test]
    fn corrupt_digest_is_a_mismatch() {
        let hasher = cheap();
        assert_eq!(hasher.verify("", "secret"), Verification::Mismatch);
        assert_eq!(hasher.verify("not-a-phc-string", "secret"), Verification::Mismatch);
        assert_eq!(
            hasher.verify("$2a$14$abcdefghijklmnopqrstuuABCDEFGHIJKLMNOPQRSTUVWXYZ01234", "secret"),
            Verification::Mismatch
        );
    }

    #[test]
    fn digest_from_another_cost_still_verifies() {
        let hashed = cheap().hash("secret").unwrap();
        let other = CredentialHasher::new(HashCost {
            memory_kib: 2048,
            iterations: 2,
            parallelism: 1,
        });
        assert!(other.verify(&hashed, "secret").is_match());
    }

    #[test]
    fn decoy_verification_never_matches() {
        let hasher = cheap();
        assert!(hasher.decoy.get().is_none());

        assert_eq!(hasher.verify_decoy("secret"), Verification::Mismatch);
        assert_eq!(hasher.verify_decoy("gatehouse-decoy-credential"), Verification::Mismatch);

        let decoy = hasher.decoy.get().unwrap().as_deref().unwrap();
        assert!(decoy.starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));
    }

    #[test]
    fn invalid_cost_is_an_error() {
        let hasher = CredentialHasher::new(HashCost {
            memory_kib: 1,
            iterations: 0,
            parallelism: 0,
        });
        assert!(matches!(hasher.hash("secret"), Err(HashError::Hash(_))));
    }
}
