//! Symmetric encryption of bearer tokens for cookie storage.
//!
//! Tokens live only inside client-held cookies, so the payload is AES-256-GCM
//! under a process-wide key: `base64url(nonce (12 bytes) || ciphertext)`.
//! Decryption treats the cookie as untrusted input and fails closed on any
//! malformed, truncated, or tampered value.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use anyhow::Result;
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

const NONCE_LEN: usize = 12;

/// A provider-issued access or refresh token with its expiry and scopes.
///
/// Never persisted server-side; the encrypted cookie is the only copy.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BearerToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub scope: BTreeSet<String>,
}

impl BearerToken {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Why a cookie value could not be turned back into a token.
///
/// Callers treat every variant as "no token"; the distinction only feeds
/// logs and the session gate's deny reason.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecryptError {
    #[error("cookie value is not valid base64")]
    Encoding,
    #[error("cookie value is too short to hold a nonce")]
    Truncated,
    #[error("ciphertext rejected")]
    Cipher,
    #[error("decrypted payload is not a token")]
    Payload,
}

/// Encrypts and decrypts tokens under the process-wide cookie key.
pub struct TokenCodec {
    cipher: Aes256Gcm,
}

impl TokenCodec {
    /// Build a codec from the configured 32-byte key.
    #[must_use]
    pub fn new(key: [u8; 32]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(&key);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Encrypt a token for cookie storage.
    ///
    /// # Errors
    /// Returns an error if serialization or encryption fails.
    pub fn encrypt(&self, token: &BearerToken) -> Result<String> {
        let plaintext = serde_json::to_vec(token)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|e| anyhow::anyhow!("encryption failure: {e}"))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);

        Ok(Base64UrlUnpadded::encode_string(&payload))
    }

    /// Decrypt a cookie value back into a token.
    ///
    /// # Errors
    /// Returns a [`DecryptError`] on malformed encoding, truncation,
    /// tampering, a wrong key, or a payload that is not a serialized token.
    pub fn decrypt(&self, encoded: &str) -> Result<BearerToken, DecryptError> {
        let payload =
            Base64UrlUnpadded::decode_vec(encoded).map_err(|_| DecryptError::Encoding)?;
        if payload.len() <= NONCE_LEN {
            return Err(DecryptError::Truncated);
        }

        let (nonce_bytes, ciphertext) = payload.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| DecryptError::Cipher)?;

        serde_json::from_slice(&plaintext).map_err(|_| DecryptError::Payload)
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn token() -> BearerToken {
        BearerToken {
            value: "BQDWaeNvr-access-token".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            scope: ["user-read-private", "playlist-modify-public"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let codec = TokenCodec::new([42u8; 32]);
        let token = token();
        let encoded = codec.encrypt(&token);
        assert!(encoded.is_ok());
        if let Ok(encoded) = encoded {
            assert!(!encoded.contains(&token.value));
            assert_eq!(codec.decrypt(&encoded), Ok(token));
        }
    }

    #[test]
    fn decrypt_fails_on_tampered_ciphertext() {
        let codec = TokenCodec::new([42u8; 32]);
        let encoded = codec.encrypt(&token());
        assert!(encoded.is_ok());
        if let Ok(encoded) = encoded {
            let mut payload = Base64UrlUnpadded::decode_vec(&encoded).unwrap_or_default();
            if let Some(byte) = payload.last_mut() {
                *byte ^= 0xFF;
            }
            let tampered = Base64UrlUnpadded::encode_string(&payload);
            assert_eq!(codec.decrypt(&tampered), Err(DecryptError::Cipher));
        }
    }

    #[test]
    fn decrypt_fails_with_wrong_key() {
        let codec = TokenCodec::new([42u8; 32]);
        let other = TokenCodec::new([43u8; 32]);
        let encoded = codec.encrypt(&token());
        assert!(encoded.is_ok());
        if let Ok(encoded) = encoded {
            assert_eq!(other.decrypt(&encoded), Err(DecryptError::Cipher));
        }
    }

    #[test]
    fn decrypt_fails_on_garbage_input() {
        let codec = TokenCodec::new([42u8; 32]);
        assert_eq!(
            codec.decrypt("not base64 at all!!"),
            Err(DecryptError::Encoding)
        );
        assert_eq!(codec.decrypt("AAAA"), Err(DecryptError::Truncated));
        assert_eq!(codec.decrypt(""), Err(DecryptError::Truncated));
    }

    #[test]
    fn expiry_is_inclusive_of_now() {
        let mut token = token();
        let now = Utc::now();
        token.expires_at = now;
        assert!(token.is_expired(now));
        token.expires_at = now + Duration::seconds(1);
        assert!(!token.is_expired(now));
    }
}
