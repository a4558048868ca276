//! Conversions between compact wire values and their human-facing forms.
//!
//! UUIDs travel as 16 raw bytes and timestamps as epoch seconds. Timestamps
//! are truncated to whole seconds on the way in; that precision is not
//! recovered on the way out.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Format of timestamps produced by [`epoch_to_iso`].
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// 0001-01-01T00:00:00Z
const MIN_EPOCH: i64 = -62_135_596_800;
/// 9999-12-31T23:59:59Z
const MAX_EPOCH: i64 = 253_402_300_799;

/// A compact value failed to convert.
#[derive(Debug, Error)]
pub enum CompactValueError {
    #[error("invalid UUID: {0}")]
    Uuid(#[from] uuid::Error),

    #[error("invalid timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        source: chrono::ParseError,
    },

    #[error("timestamp {0} is outside the supported range")]
    EpochOutOfRange(i64),
}

/// Compress a UUID string (simple or hyphenated) to its 16 bytes.
pub fn uuid_to_bytes(uuid: &str) -> Result<[u8; 16], CompactValueError> {
    Ok(*Uuid::parse_str(uuid)?.as_bytes())
}

/// Expand 16 bytes to a lowercase 32-character hex UUID.
pub fn bytes_to_uuid(bytes: &[u8]) -> Result<String, CompactValueError> {
    Ok(Uuid::from_slice(bytes)?.simple().to_string())
}

/// Convert an ISO-8601 timestamp to epoch seconds, dropping sub-second precision.
///
/// Accepts RFC 3339 with any offset. Timestamps without an offset are read as UTC.
///
/// The result must render back through [`epoch_to_iso`], so instants outside
/// years 0001-9999 UTC are rejected even when their local form is in range.
pub fn iso_to_epoch(iso: &str) -> Result<i64, CompactValueError> {
    let iso = iso.trim();
    let epoch = match DateTime::parse_from_rfc3339(iso) {
        Ok(dt) => dt.timestamp(),
        Err(source) => NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc().timestamp())
            .map_err(|_| CompactValueError::Timestamp {
                value: iso.to_string(),
                source,
            })?,
    };
    check_range(epoch)
}

/// Convert epoch seconds to a UTC ISO-8601 timestamp (`YYYY-MM-DDTHH:MM:SSZ`).
pub fn epoch_to_iso(epoch: i64) -> Result<String, CompactValueError> {
    let epoch = check_range(epoch)?;
    let dt = DateTime::<Utc>::from_timestamp(epoch, 0)
        .ok_or(CompactValueError::EpochOutOfRange(epoch))?;
    Ok(dt.format(ISO_FORMAT).to_string())
}

fn check_range(epoch: i64) -> Result<i64, CompactValueError> {
    if (MIN_EPOCH..=MAX_EPOCH).contains(&epoch) {
        Ok(epoch)
    } else {
        Err(CompactValueError::EpochOutOfRange(epoch))
    }
}

/// Audit correlation carried by a token.
///
/// A token minted from scratch carries one audit id. A token obtained by
/// exchanging another token carries its own id followed by its parent's.
/// Serializes as a bare string or a list respectively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuditChain {
    Single(String),
    Chain(Vec<String>),
}

impl AuditChain {
    /// Build from a list of ids. A one-element list collapses to [`AuditChain::Single`].
    pub fn from_ids(mut ids: Vec<String>) -> Self {
        if ids.len() == 1 {
            if let Some(id) = ids.pop() {
                return Self::Single(id);
            }
        }
        Self::Chain(ids)
    }

    /// All ids, newest first.
    pub fn ids(&self) -> Vec<&str> {
        match self {
            Self::Single(id) => vec![id.as_str()],
            Self::Chain(ids) => ids.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for AuditChain {
    fn from(id: &str) -> Self {
        Self::Single(id.to_string())
    }
}
