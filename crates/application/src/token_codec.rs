//! Token minting and hashing for magic-link authentication.
//!
//! Tokens are cryptographically random, sent to the user once, and stored
//! only as keyed SHA-256 hashes of `secret ‖ token`, so a leaked store
//! cannot be replayed without the server secret. Unsubscribe links use a
//! stable HMAC-SHA256 signature over the email address instead of a
//! persisted token record.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use linkletter_core::{AppError, AppResult};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Ephemeral token material produced by [`TokenCodec::mint_token`].
///
/// `token` is handed to the user and never persisted; `token_hash` is what
/// the subscriber store keeps.
#[derive(Debug, Clone)]
pub struct TokenMaterial {
    /// Raw hex-encoded token for the emailed link.
    pub token: String,
    /// Keyed hash of the token for storage.
    pub token_hash: String,
    /// Expiry timestamp, when a TTL was requested.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Derives tokens, keyed hashes, and HMAC signatures from the server secret.
#[derive(Clone)]
pub struct TokenCodec {
    secret: String,
}

impl TokenCodec {
    /// Creates a codec keyed with the server secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Generates a random token, its storage hash, and an optional expiry
    /// offset `ttl` from now.
    ///
    /// Fails rather than falling back to a predictable token when the
    /// system randomness source is unavailable.
    pub fn mint_token(&self, ttl: Option<Duration>) -> AppResult<TokenMaterial> {
        let mut bytes = [0u8; 32];
        getrandom::fill(&mut bytes)
            .map_err(|error| AppError::Internal(format!("failed to generate token: {error}")))?;

        let token = hex::encode(bytes);
        let token_hash = self.hash_of(&token);
        let expires_at = ttl.map(|ttl| Utc::now() + ttl);

        Ok(TokenMaterial {
            token,
            token_hash,
            expires_at,
        })
    }

    /// Recomputes the keyed storage hash for a presented token.
    ///
    /// Deterministic: verification compares this against the stored value,
    /// never raw token against raw token.
    #[must_use]
    pub fn hash_of(&self, token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Computes a stable HMAC-SHA256 signature over arbitrary content.
    ///
    /// Used for unsubscribe links: the signature is re-derivable from the
    /// email address alone, so no token record is persisted and the link
    /// never expires.
    pub fn hmac_of(&self, content: &str) -> AppResult<String> {
        // HMAC accepts keys of any length; unreachable in practice.
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|error| AppError::Internal(format!("failed to key signature: {error}")))?;
        mac.update(content.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}
