//! HMAC-signed media URLs for the stores that serve blobs through the board
//! itself (`memory`, `local`).
//!
//! URL shape: `{base}/media/{base64url(key)}?expires={unix}&signature={hex}`.
//! The key is base64url encoded because client filenames may contain any
//! character; the signature covers the raw key and the expiry.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use domains::{AppError, AttachmentKey, Result};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretSlice};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signed url has expired")]
    Expired,
    #[error("signature does not match")]
    Invalid,
}

pub struct UrlSigner {
    key: SecretSlice<u8>,
    base_url: String,
}

impl UrlSigner {
    pub fn new(key: impl Into<Vec<u8>>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            key: SecretSlice::from(key.into()),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn mac(&self, key: &str, expires: i64) -> HmacSha256 {
        // HMAC accepts keys of any length, so this cannot fail.
        let mut mac = HmacSha256::new_from_slice(self.key.expose_secret())
            .unwrap_or_else(|_| unreachable!("hmac takes any key length"));
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }

    /// A URL for `key` that stops verifying after `expires_at`.
    pub fn sign(&self, key: &AttachmentKey, expires_at: DateTime<Utc>) -> String {
        let expires = expires_at.timestamp();
        let signature = hex::encode(self.mac(key.as_str(), expires).finalize().into_bytes());
        format!(
            "{}/media/{}?expires={}&signature={}",
            self.base_url,
            encode_path_key(key),
            expires,
            signature
        )
    }

    /// Signs relative to the current time.
    ///
    /// Expiry has one-second resolution, so two calls within the same second
    /// return the same URL. Presigned S3 URLs behave the same way.
    pub fn sign_for(&self, key: &AttachmentKey, ttl: Duration) -> Result<String> {
        self.sign_from(key, Utc::now(), ttl)
    }

    fn sign_from(&self, key: &AttachmentKey, now: DateTime<Utc>, ttl: Duration) -> Result<String> {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| AppError::Internal(format!("url ttl of {ttl:?} is out of range")))?;
        Ok(self.sign(key, expires_at))
    }

    pub fn verify(
        &self,
        key: &AttachmentKey,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<(), SignatureError> {
        let provided = hex::decode(signature).map_err(|_| SignatureError::Invalid)?;
        self.mac(key.as_str(), expires)
            .verify_slice(&provided)
            .map_err(|_| SignatureError::Invalid)?;
        if now.timestamp() > expires {
            return Err(SignatureError::Expired);
        }
        Ok(())
    }
}

pub fn encode_path_key(key: &AttachmentKey) -> String {
    URL_SAFE_NO_PAD.encode(key.as_str())
}

/// Reverses `encode_path_key`; `None` for anything that is not one of ours.
pub fn decode_path_key(segment: &str) -> Option<AttachmentKey> {
    let raw = URL_SAFE_NO_PAD.decode(segment).ok()?;
    String::from_utf8(raw).ok().map(AttachmentKey::from_stored)
}
