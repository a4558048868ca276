//! Token facts: what goes into a token and what comes back out.

use crate::compact::AuditChain;
use crate::trust::TrustRef;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, SecondsFormat, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Token data handed to a formatter at issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    /// ISO-8601 issuance time.
    pub issued_at: String,

    /// ISO-8601 expiry time.
    pub expires_at: String,

    /// Audit ids, newest first.
    #[serde(default)]
    pub audit_ids: Vec<String>,

    /// Trust the token is delegated through, if any.
    #[serde(
        rename = "OS-TRUST:trust",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub trust: Option<TrustClaim>,
}

/// Trust sub-structure of [`TokenData`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustClaim {
    pub id: String,
}

impl TokenData {
    pub fn new(
        issued_at: impl Into<String>,
        expires_at: impl Into<String>,
        audit_ids: Vec<String>,
    ) -> Self {
        Self {
            issued_at: issued_at.into(),
            expires_at: expires_at.into(),
            audit_ids,
            trust: None,
        }
    }

    /// Token data issued now, expiring after `lifetime`, with a fresh audit id.
    pub fn issue_now(lifetime: Duration) -> Self {
        let now = Utc::now();
        Self::new(
            now.to_rfc3339_opts(SecondsFormat::Micros, true),
            (now + lifetime).to_rfc3339_opts(SecondsFormat::Micros, true),
            vec![new_audit_id()],
        )
    }

    /// Chain a parent token's audit id after this token's own, as a token exchange does.
    pub fn with_parent_audit_id(mut self, parent: impl Into<String>) -> Self {
        self.audit_ids.push(parent.into());
        self
    }

    /// Delegate through a trust.
    pub fn with_trust(mut self, trust_id: impl Into<String>) -> Self {
        self.trust = Some(TrustClaim { id: trust_id.into() });
        self
    }
}

/// A random, URL-safe audit id (22 characters).
pub fn new_audit_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Facts recovered from a validated token, in human-facing form.
///
/// This is the input to a [`crate::TokenMetadataExpander`].
#[derive(Debug, Clone, PartialEq)]
pub struct TokenFacts {
    pub user_id: String,
    pub methods: Vec<String>,
    pub extras: Map<String, Value>,
    pub project_id: Option<String>,
    pub expires_at: String,
    pub issued_at: String,
    pub trust: Option<TrustRef>,
    pub audit_info: AuditChain,
}

/// The full token record produced by a metadata expander.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub user_id: String,

    pub methods: Vec<String>,

    /// Expander-specific content (roles, catalog, ...).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extras: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    pub expires_at: String,

    pub issued_at: String,

    pub audit_info: AuditChain,

    #[serde(
        rename = "OS-TRUST:trust",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub trust: Option<TrustRef>,
}

impl From<TokenFacts> for TokenRecord {
    fn from(facts: TokenFacts) -> Self {
        Self {
            user_id: facts.user_id,
            methods: facts.methods,
            extras: facts.extras,
            project_id: facts.project_id,
            expires_at: facts.expires_at,
            issued_at: facts.issued_at,
            audit_info: facts.audit_info,
            trust: facts.trust,
        }
    }
}

/// Result of validating a wire token.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedToken {
    pub user_id: String,
    pub project_id: Option<String>,
    pub record: TokenRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_data_from_json() {
        let data: TokenData = serde_json::from_value(serde_json::json!({
            "issued_at": "2024-01-01T00:00:00Z",
            "expires_at": "2024-01-01T01:00:00Z",
            "audit_ids": ["abc123"],
            "OS-TRUST:trust": {"id": "0f1e2d3c4b5a69788796a5b4c3d2e1f0"}
        }))
        .unwrap();

        assert_eq!(data.audit_ids, vec!["abc123"]);
        assert_eq!(
            data.trust.unwrap().id,
            "0f1e2d3c4b5a69788796a5b4c3d2e1f0"
        );
    }

    #[test]
    fn test_issue_now() {
        let data = TokenData::issue_now(Duration::hours(1)).with_parent_audit_id("parent");
        assert_eq!(data.audit_ids.len(), 2);
        assert_eq!(data.audit_ids[0].len(), 22);
        assert_eq!(data.audit_ids[1], "parent");
        assert!(data.trust.is_none());
        assert!(data.expires_at > data.issued_at);
    }

    #[test]
    fn test_record_serialization() {
        let record = TokenRecord {
            user_id: "u".into(),
            methods: vec!["token".into()],
            extras: Map::new(),
            project_id: None,
            expires_at: "2024-01-01T01:00:00Z".into(),
            issued_at: "2024-01-01T00:00:00Z".into(),
            audit_info: AuditChain::from("abc123"),
            trust: None,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["audit_info"], "abc123");
        assert!(json.get("project_id").is_none());
        assert!(json.get("OS-TRUST:trust").is_none());
    }
}
