//! Trust (`F01`) tokens: project-scoped and delegated through a trust.

use super::{
    CompactTimes, DEFAULT_METHODS, TokenFormat, pack, take_audit, take_timestamp, take_uuid,
    unpack, uuid_field,
};
use crate::claims::{TokenData, TokenFacts, ValidatedToken};
use crate::envelope::CryptoEnvelope;
use crate::error::TokenError;
use crate::expander::TokenMetadataExpander;
use crate::trust::TrustLookup;
use serde_json::Map;
use std::sync::Arc;

const FORMAT: TokenFormat = TokenFormat::Trust;

/// Formatter for trust-scoped tokens.
///
/// The payload is always `(user, project, trust, issued_at, expires_at, audit)`.
/// Validation resolves the trust through a [`TrustLookup`]; if the trust is gone
/// the lookup's error is returned as-is.
#[derive(Clone)]
pub struct TrustTokenFormatter {
    envelope: CryptoEnvelope,
    trusts: Arc<dyn TrustLookup>,
    expander: Arc<dyn TokenMetadataExpander>,
    methods: Vec<String>,
}

impl TrustTokenFormatter {
    pub fn new(
        envelope: CryptoEnvelope,
        trusts: Arc<dyn TrustLookup>,
        expander: Arc<dyn TokenMetadataExpander>,
    ) -> Self {
        Self {
            envelope,
            trusts,
            expander,
            methods: DEFAULT_METHODS.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Override the authentication methods reported for validated tokens.
    pub fn with_methods(mut self, methods: Vec<String>) -> Self {
        self.methods = methods;
        self
    }

    pub fn format(&self) -> TokenFormat {
        FORMAT
    }

    /// Create a trust token. Both the project and the trust in `data` are required.
    pub fn create_token(
        &self,
        user_id: &str,
        project_id: Option<&str>,
        data: &TokenData,
    ) -> Result<String, TokenError> {
        let project_id = project_id
            .filter(|p| !p.is_empty())
            .ok_or_else(|| TokenError::MissingClaim {
                claim: "project_id".to_string(),
            })?;
        let trust_id = data
            .trust
            .as_ref()
            .map(|t| t.id.as_str())
            .ok_or_else(|| TokenError::MissingClaim {
                claim: "OS-TRUST:trust".to_string(),
            })?;
        let times = CompactTimes::from_token_data(data)?;

        let mut payload = vec![
            uuid_field(user_id)?,
            uuid_field(project_id)?,
            uuid_field(trust_id)?,
        ];
        payload.extend(times.into_fields());

        let token = pack(&self.envelope, FORMAT, &payload)?;
        tracing::debug!(format = %FORMAT, user_id, trust_id, "Created token");
        Ok(token)
    }

    /// Validate a trust token, resolve its trust and rebuild its record.
    pub fn validate_token(&self, wire: &str) -> Result<ValidatedToken, TokenError> {
        let payload = unpack(&self.envelope, FORMAT, wire)?;

        let [user, project, trust, issued_at, expires_at, audit] = payload.as_slice() else {
            return Err(TokenError::MalformedPayload(format!(
                "{FORMAT} payload must have 6 fields, found {}",
                payload.len()
            )));
        };

        let user_id = take_uuid(user, "user_id")?;
        let project_id = take_uuid(project, "project_id")?;
        let trust_id = take_uuid(trust, "trust_id")?;
        let issued_at = take_timestamp(issued_at, "issued_at")?;
        let expires_at = take_timestamp(expires_at, "expires_at")?;
        let audit_info = take_audit(audit)?;

        let trust_ref = self
            .trusts
            .get_trust(&trust_id)
            .map_err(TokenError::Collaborator)?;

        let facts = TokenFacts {
            user_id: user_id.clone(),
            methods: self.methods.clone(),
            extras: Map::new(),
            project_id: Some(project_id.clone()),
            expires_at,
            issued_at,
            trust: Some(trust_ref),
            audit_info,
        };
        let record = self
            .expander
            .expand(facts)
            .map_err(TokenError::Collaborator)?;
        tracing::debug!(format = %FORMAT, user_id = %user_id, trust_id = %trust_id, "Validated token");

        Ok(ValidatedToken {
            user_id,
            project_id: Some(project_id),
            record,
        })
    }
}

impl std::fmt::Debug for TrustTokenFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustTokenFormatter")
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}
