//! Login credential checks
//!
//! The login endpoint only answers whether a username/password pair is
//! valid; it issues no session and gates no other route.

use crate::config::AuthConfig;
use sha2::{Digest, Sha256};

/// Decides whether a username/password pair is acceptable
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// Single account whose password is kept as a SHA-256 digest.
///
/// Unsalted SHA-256 is only good enough for a single operator account
/// behind HTTPS; a multi-user deployment needs a real credential store.
pub struct ConfiguredCredentials {
    username: String,
    password_digest: [u8; 32],
}

impl ConfiguredCredentials {
    pub fn new(username: impl Into<String>, password_sha256_hex: &str) -> Option<Self> {
        let bytes = hex::decode(password_sha256_hex.trim()).ok()?;
        let password_digest: [u8; 32] = bytes.try_into().ok()?;
        Some(Self {
            username: username.into(),
            password_digest,
        })
    }

    pub fn from_config(config: &AuthConfig) -> Option<Self> {
        match (&config.username, &config.password_sha256) {
            (Some(username), Some(digest)) => Self::new(username.clone(), digest),
            _ => None,
        }
    }
}

impl CredentialVerifier for ConfiguredCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        let digest: [u8; 32] = Sha256::digest(password.as_bytes()).into();
        let user_ok = constant_time_eq(username.as_bytes(), self.username.as_bytes());
        let password_ok = constant_time_eq(&digest, &self.password_digest);
        user_ok & password_ok
    }
}

/// Rejects everyone; used when no credential is configured
pub struct DenyAll;

impl CredentialVerifier for DenyAll {
    fn verify(&self, _username: &str, _password: &str) -> bool {
        false
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Hex SHA-256 of a password, for writing into configuration
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_credentials() {
        let verifier = ConfiguredCredentials::new("driver", &hash_password("s3cret")).unwrap();
        assert!(verifier.verify("driver", "s3cret"));
        assert!(!verifier.verify("driver", "wrong"));
        assert!(!verifier.verify("other", "s3cret"));
        assert!(!verifier.verify("", ""));
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            hash_password("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_rejects_bad_digest() {
        assert!(ConfiguredCredentials::new("driver", "zz").is_none());
        assert!(ConfiguredCredentials::new("driver", "abcd").is_none());
    }

    #[test]
    fn test_from_config_needs_both_halves() {
        let mut config = AuthConfig {
            username: Some("driver".to_string()),
            password_sha256: None,
        };
        assert!(ConfiguredCredentials::from_config(&config).is_none());

        config.password_sha256 = Some(hash_password("pw"));
        let verifier = ConfiguredCredentials::from_config(&config).unwrap();
        assert!(verifier.verify("driver", "pw"));
    }

    #[test]
    fn test_deny_all() {
        assert!(!DenyAll.verify("driver", "pw"));
    }
}
