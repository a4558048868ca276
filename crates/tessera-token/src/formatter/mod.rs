//! Token formats and the plumbing they share.
//!
//! Every wire token starts with a three-character marker naming the payload
//! layout that produced it:
//!
//! | Marker | Format | Payload |
//! |--------|--------|---------|
//! | `F00` | [`TokenFormat::Standard`] | `(user, [project], issued_at, expires_at, audit)` |
//! | `F01` | [`TokenFormat::Trust`] | `(user, project, trust, issued_at, expires_at, audit)` |
//!
//! The marker is read before anything is decrypted, so validation never has
//! to guess the layout. It is also bound into the envelope's associated data:
//! a token relabelled with another registered marker fails authentication.

pub mod standard;
pub mod trust;

pub use standard::StandardTokenFormatter;
pub use trust::TrustTokenFormatter;

use crate::claims::TokenData;
use crate::compact::{self, AuditChain};
use crate::envelope::{CryptoEnvelope, EnvelopeHeader};
use crate::error::TokenError;
use crate::payload::{self, PayloadField};

/// Length of the format marker in bytes.
pub const MARKER_LEN: usize = 3;

/// Authentication methods reported for tokens unless configured otherwise.
pub const DEFAULT_METHODS: [&str; 2] = ["password", "token"];

/// The registered token formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenFormat {
    Standard,
    Trust,
}

impl TokenFormat {
    pub const ALL: [TokenFormat; 2] = [TokenFormat::Standard, TokenFormat::Trust];

    pub fn marker(self) -> &'static str {
        match self {
            Self::Standard => "F00",
            Self::Trust => "F01",
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.marker() == marker)
    }

    /// Split a wire token into its format and ciphertext.
    pub fn split(wire: &str) -> Result<(Self, &str), TokenError> {
        let unsupported = || TokenError::UnsupportedFormat {
            marker: wire.chars().take(MARKER_LEN).collect(),
        };

        let marker = wire.get(..MARKER_LEN).ok_or_else(unsupported)?;
        let format = Self::from_marker(marker).ok_or_else(unsupported)?;
        Ok((format, &wire[MARKER_LEN..]))
    }
}

impl std::fmt::Display for TokenFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.marker())
    }
}

/// Encode, encrypt and mark a payload.
pub(crate) fn pack(
    envelope: &CryptoEnvelope,
    format: TokenFormat,
    fields: &[PayloadField],
) -> Result<String, TokenError> {
    let encoded = payload::encode(fields)?;
    let marker = format.marker();
    let ciphertext = envelope.encrypt_with_context(&encoded, marker.as_bytes())?;
    Ok(format!("{marker}{ciphertext}"))
}

/// Check the marker, decrypt and decode a payload.
pub(crate) fn unpack(
    envelope: &CryptoEnvelope,
    format: TokenFormat,
    wire: &str,
) -> Result<Vec<PayloadField>, TokenError> {
    let (found, ciphertext) = TokenFormat::split(wire)?;
    if found != format {
        return Err(TokenError::UnsupportedFormat {
            marker: found.marker().to_string(),
        });
    }
    let decrypted = envelope.decrypt_with_context(ciphertext, format.marker().as_bytes())?;
    payload::decode(&decrypted)
}

/// Issued-at, expiry and audit chain in compact form.
pub(crate) struct CompactTimes {
    pub issued_at: i64,
    pub expires_at: i64,
    pub audit: AuditChain,
}

impl CompactTimes {
    pub fn from_token_data(data: &TokenData) -> Result<Self, TokenError> {
        Ok(Self {
            issued_at: compact::iso_to_epoch(&data.issued_at)?,
            expires_at: compact::iso_to_epoch(&data.expires_at)?,
            audit: AuditChain::from_ids(data.audit_ids.clone()),
        })
    }

    pub fn into_fields(self) -> [PayloadField; 3] {
        [
            PayloadField::Integer(self.issued_at),
            PayloadField::Integer(self.expires_at),
            audit_field(self.audit),
        ]
    }
}

pub(crate) fn uuid_field(id: &str) -> Result<PayloadField, TokenError> {
    Ok(PayloadField::Bytes(compact::uuid_to_bytes(id)?.to_vec()))
}

pub(crate) fn take_uuid(field: &PayloadField, name: &str) -> Result<String, TokenError> {
    let bytes = field.as_bytes().ok_or_else(|| mismatch(name, "bytes", field))?;
    Ok(compact::bytes_to_uuid(bytes)?)
}

pub(crate) fn take_timestamp(field: &PayloadField, name: &str) -> Result<String, TokenError> {
    let epoch = field
        .as_integer()
        .ok_or_else(|| mismatch(name, "integer", field))?;
    Ok(compact::epoch_to_iso(epoch)?)
}

pub(crate) fn take_audit(field: &PayloadField) -> Result<AuditChain, TokenError> {
    match field {
        PayloadField::Text(id) => Ok(AuditChain::Single(id.clone())),
        PayloadField::Array(items) => items
            .iter()
            .map(|item| match item {
                PayloadField::Text(id) => Ok(id.clone()),
                other => Err(mismatch("audit id", "text", other)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(AuditChain::Chain),
        other => Err(mismatch("audit info", "text or array", other)),
    }
}

fn audit_field(audit: AuditChain) -> PayloadField {
    match audit {
        AuditChain::Single(id) => PayloadField::Text(id),
        AuditChain::Chain(ids) => {
            PayloadField::Array(ids.into_iter().map(PayloadField::Text).collect())
        }
    }
}

fn mismatch(name: &str, expected: &str, found: &PayloadField) -> TokenError {
    TokenError::MalformedPayload(format!(
        "{name}: expected {expected}, found {}",
        found.kind()
    ))
}

/// Information about a token that can be read without keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInfo {
    pub format: TokenFormat,
    pub header: EnvelopeHeader,
}

/// Inspect a token without decrypting it (for debugging).
///
/// Nothing returned here is authenticated.
pub fn inspect_token_unverified(wire: &str) -> Result<TokenInfo, TokenError> {
    let (format, ciphertext) = TokenFormat::split(wire)?;
    let header = EnvelopeHeader::parse_unverified(ciphertext)?;
    Ok(TokenInfo { format, header })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_are_distinct_and_three_bytes() {
        let standard = TokenFormat::Standard.marker();
        let trust = TokenFormat::Trust.marker();
        assert_ne!(standard, trust);
        for format in TokenFormat::ALL {
            assert_eq!(format.marker().len(), MARKER_LEN);
            assert!(format.marker().is_ascii());
            assert_eq!(TokenFormat::from_marker(format.marker()), Some(format));
        }
    }

    #[test]
    fn test_split() {
        let (format, rest) = TokenFormat::split("F01abc").unwrap();
        assert_eq!(format, TokenFormat::Trust);
        assert_eq!(rest, "abc");

        let (format, rest) = TokenFormat::split("F00").unwrap();
        assert_eq!(format, TokenFormat::Standard);
        assert_eq!(rest, "");
    }

    #[test]
    fn test_split_unsupported() {
        for wire in ["", "F0", "F02abc", "gAAAAAB", "Fé0abc"] {
            let err = TokenFormat::split(wire).unwrap_err();
            assert!(
                matches!(err, TokenError::UnsupportedFormat { .. }),
                "{wire:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_take_audit() {
        let single = take_audit(&PayloadField::Text("abc".into())).unwrap();
        assert_eq!(single, AuditChain::Single("abc".into()));

        let chain = take_audit(&PayloadField::Array(vec![
            PayloadField::Text("a".into()),
            PayloadField::Text("b".into()),
        ]))
        .unwrap();
        assert_eq!(chain, AuditChain::Chain(vec!["a".into(), "b".into()]));

        assert!(matches!(
            take_audit(&PayloadField::Integer(3)),
            Err(TokenError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_take_uuid_checks_type_and_length() {
        assert!(matches!(
            take_uuid(&PayloadField::Integer(1), "user_id"),
            Err(TokenError::MalformedPayload(_))
        ));
        assert!(matches!(
            take_uuid(&PayloadField::Bytes(vec![0; 4]), "user_id"),
            Err(TokenError::MalformedValue(_))
        ));
    }
}
