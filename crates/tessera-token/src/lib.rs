//! # tessera-token
//!
//! Compact, encrypted identity tokens for Tessera.
//!
//! This crate provides functionality for:
//! - Managing rings of 256-bit symmetric keys with rotation
//! - Sealing small binary payloads in an authenticated envelope
//! - Issuing standard and trust-scoped tokens
//! - Validating tokens and rebuilding the identity record they describe
//!
//! ## Token Anatomy
//!
//! ```text
//! F00 gpEAAAAAZZKp...
//! ^^^ ^^^^^^^^^^^^^^
//!  |   encrypted, authenticated CBOR payload (base64url)
//!  format marker
//! ```
//!
//! | Format | Marker | Scope |
//! |--------|--------|-------|
//! | Standard | `F00` | user, optionally a project |
//! | Trust | `F01` | user, project and the trust delegating it |
//!
//! ## Why This Shape?
//!
//! - **No session table**: everything needed to rebuild the token lives in it
//! - **Small**: UUIDs travel as 16 bytes, timestamps as integers
//! - **Rotatable**: any key still in the ring can open a token
//! - **Tamper-evident**: any change to the ciphertext fails authentication

pub mod claims;
pub mod compact;
pub mod envelope;
pub mod error;
pub mod expander;
pub mod formatter;
pub mod keys;
pub mod payload;
pub mod provider;
pub mod trust;

pub use claims::{TokenData, TokenFacts, TokenRecord, TrustClaim, ValidatedToken, new_audit_id};
pub use compact::AuditChain;
pub use envelope::CryptoEnvelope;
pub use error::TokenError;
pub use expander::{BasicExpander, TokenMetadataExpander};
pub use formatter::{
    StandardTokenFormatter, TokenFormat, TokenInfo, TrustTokenFormatter, inspect_token_unverified,
};
pub use keys::{
    KeyRepository, KeyRing, KeyRingProvider, SharedKeyRing, StaticKeyRing, SymmetricKey,
    provider_from_config,
};
pub use provider::TokenProvider;
pub use trust::{InMemoryTrustStore, TrustLookup, TrustNotFound, TrustRef};
