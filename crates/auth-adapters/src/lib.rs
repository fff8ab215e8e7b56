//! # auth-adapters
//!
//! Shared-secret implementation of `CredentialGate`: one fixed username and
//! a password taken from configuration. The gate is all-or-nothing; there
//! are no per-user identities on an anonymous board.

use domains::CredentialGate;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

/// The only username the gate accepts.
pub const GATE_USERNAME: &str = "admin";

pub struct SharedSecretGate {
    /// SHA-256 of the configured password; the plain secret is not kept.
    password_digest: [u8; 32],
}

impl SharedSecretGate {
    pub fn new(password: &SecretString) -> Self {
        Self {
            password_digest: digest(password.expose_secret()),
        }
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Comparing fixed-size digests with a full fold keeps the running time
/// independent of where the first mismatching byte is.
fn digests_match(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl CredentialGate for SharedSecretGate {
    fn verify(&self, username: &str, password: &str) -> bool {
        let password_ok = digests_match(&digest(password), &self.password_digest);
        let username_ok = username == GATE_USERNAME;
        if !(password_ok && username_ok) {
            tracing::debug!(username, "credential check failed");
        }
        password_ok && username_ok
    }
}
