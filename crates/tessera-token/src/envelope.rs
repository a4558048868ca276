//! Authenticated encryption envelope over a rotating key ring.
//!
//! ## Format
//!
//! ```text
//! base64url( version (1) || created_at (8, big endian) || nonce (24) || ciphertext || tag (16) )
//! ```
//!
//! The body is sealed with XChaCha20-Poly1305 under a single key from the
//! ring. `version || created_at` is bound as associated data, so the header
//! cannot be altered without failing authentication. Callers may bind extra
//! clear-text context (the token formats bind their marker); the same context
//! must be supplied to open the envelope.
//!
//! New envelopes are always sealed with the primary key. Opening tries every
//! key in ring order and the first key that authenticates wins; a token sealed
//! under a key that has since been demoted still opens, one sealed under a key
//! that has been removed does not.

use crate::error::TokenError;
use crate::keys::{KeyRingProvider, SymmetricKey};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use chrono::{DateTime, Utc};
use rand::RngCore;
use std::sync::Arc;

/// Envelope format version.
pub const VERSION: u8 = 0x91;

/// Size of the nonce in bytes (192 bits for XChaCha20).
pub const NONCE_SIZE: usize = 24;

/// Size of the authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

const TIMESTAMP_SIZE: usize = 8;
const AAD_SIZE: usize = 1 + TIMESTAMP_SIZE;
const HEADER_SIZE: usize = AAD_SIZE + NONCE_SIZE;

/// Clear-text header of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub version: u8,
    /// Creation time in epoch seconds.
    pub created_at: i64,
}

impl EnvelopeHeader {
    /// Read the header of an encoded envelope without authenticating it.
    pub fn parse_unverified(ciphertext: &str) -> Result<Self, TokenError> {
        let raw = decode_text(ciphertext)?;
        let (header, _, _) = split(&raw)?;
        Ok(header)
    }

    /// Creation time as a UTC datetime.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.created_at, 0)
    }
}

/// Encrypts and decrypts opaque byte strings with keys from a [`KeyRingProvider`].
///
/// The envelope holds no state besides the provider. The ring is loaded per
/// operation, so a rotation takes effect on the next call.
#[derive(Clone)]
pub struct CryptoEnvelope {
    keys: Arc<dyn KeyRingProvider>,
}

impl CryptoEnvelope {
    pub fn new(keys: Arc<dyn KeyRingProvider>) -> Self {
        Self { keys }
    }

    /// Seal `plaintext` under the primary key.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, TokenError> {
        self.encrypt_with_context(plaintext, &[])
    }

    /// Seal `plaintext` under the primary key, binding `context` as associated data.
    pub fn encrypt_with_context(
        &self,
        plaintext: &[u8],
        context: &[u8],
    ) -> Result<String, TokenError> {
        let ring = self.keys.load_keys()?;
        let key = ring.primary().ok_or(TokenError::KeysNotFound)?;
        let created_at = u64::try_from(Utc::now().timestamp()).unwrap_or(0);

        let mut nonce = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce);

        let mut out = Vec::with_capacity(HEADER_SIZE + plaintext.len() + TAG_SIZE);
        out.push(VERSION);
        out.extend_from_slice(&created_at.to_be_bytes());
        out.extend_from_slice(&nonce);

        let aad = associated_data(&out[..AAD_SIZE], context);
        let sealed = cipher(key)
            .encrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .map_err(|_| TokenError::InvalidKey("encryption failed".to_string()))?;
        out.extend_from_slice(&sealed);

        Ok(URL_SAFE_NO_PAD.encode(out))
    }

    /// Open `ciphertext`, trying each key in ring order.
    pub fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>, TokenError> {
        self.decrypt_with_context(ciphertext, &[])
    }

    /// Open `ciphertext` sealed with [`CryptoEnvelope::encrypt_with_context`].
    pub fn decrypt_with_context(
        &self,
        ciphertext: &str,
        context: &[u8],
    ) -> Result<Vec<u8>, TokenError> {
        self.open(ciphertext, context).map(|(_, plaintext)| plaintext)
    }

    /// Authenticate `ciphertext` and return its creation time in epoch seconds.
    pub fn extract_timestamp(&self, ciphertext: &str, context: &[u8]) -> Result<i64, TokenError> {
        self.open(ciphertext, context)
            .map(|(header, _)| header.created_at)
    }

    fn open(
        &self,
        ciphertext: &str,
        context: &[u8],
    ) -> Result<(EnvelopeHeader, Vec<u8>), TokenError> {
        let ring = self.keys.load_keys()?;
        if ring.is_empty() {
            return Err(TokenError::KeysNotFound);
        }

        let raw = decode_text(ciphertext)?;
        let (header, nonce, sealed) = split(&raw)?;
        let aad = associated_data(&raw[..AAD_SIZE], context);

        for (index, key) in ring.iter().enumerate() {
            let opened = cipher(key).decrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: sealed,
                    aad: &aad,
                },
            );
            if let Ok(plaintext) = opened {
                tracing::debug!(key_index = index, "Envelope authenticated");
                return Ok((header, plaintext));
            }
        }

        tracing::debug!(keys = ring.len(), "Envelope failed authentication under every key");
        Err(TokenError::InvalidToken)
    }
}

impl std::fmt::Debug for CryptoEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoEnvelope").finish_non_exhaustive()
    }
}

fn cipher(key: &SymmetricKey) -> XChaCha20Poly1305 {
    XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()))
}

fn associated_data(header: &[u8], context: &[u8]) -> Vec<u8> {
    let mut aad = Vec::with_capacity(header.len() + context.len());
    aad.extend_from_slice(header);
    aad.extend_from_slice(context);
    aad
}

fn decode_text(ciphertext: &str) -> Result<Vec<u8>, TokenError> {
    URL_SAFE_NO_PAD
        .decode(ciphertext)
        .map_err(|_| TokenError::InvalidToken)
}

fn split(raw: &[u8]) -> Result<(EnvelopeHeader, &[u8], &[u8]), TokenError> {
    if raw.len() < HEADER_SIZE + TAG_SIZE || raw[0] != VERSION {
        return Err(TokenError::InvalidToken);
    }

    let mut timestamp = [0u8; TIMESTAMP_SIZE];
    timestamp.copy_from_slice(&raw[1..AAD_SIZE]);
    let created_at =
        i64::try_from(u64::from_be_bytes(timestamp)).map_err(|_| TokenError::InvalidToken)?;

    let header = EnvelopeHeader {
        version: raw[0],
        created_at,
    };
    Ok((header, &raw[AAD_SIZE..HEADER_SIZE], &raw[HEADER_SIZE..]))
}
