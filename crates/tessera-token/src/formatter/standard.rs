//! Standard (`F00`) tokens: unscoped or project-scoped.

use super::{
    CompactTimes, DEFAULT_METHODS, TokenFormat, pack, take_audit, take_timestamp, take_uuid,
    unpack, uuid_field,
};
use crate::claims::{TokenData, TokenFacts, ValidatedToken};
use crate::envelope::CryptoEnvelope;
use crate::error::TokenError;
use crate::expander::TokenMetadataExpander;
use crate::payload::PayloadField;
use serde_json::Map;
use std::sync::Arc;

const FORMAT: TokenFormat = TokenFormat::Standard;

/// Formatter for standard tokens.
///
/// The payload is `(user, issued_at, expires_at, audit)` for an unscoped token
/// and `(user, project, issued_at, expires_at, audit)` for a project-scoped
/// one. The two layouts are told apart by length alone.
#[derive(Clone)]
pub struct StandardTokenFormatter {
    envelope: CryptoEnvelope,
    expander: Arc<dyn TokenMetadataExpander>,
    methods: Vec<String>,
}

impl StandardTokenFormatter {
    pub fn new(envelope: CryptoEnvelope, expander: Arc<dyn TokenMetadataExpander>) -> Self {
        Self {
            envelope,
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

    /// Create a standard token. An empty `project_id` counts as no project.
    pub fn create_token(
        &self,
        user_id: &str,
        project_id: Option<&str>,
        data: &TokenData,
    ) -> Result<String, TokenError> {
        let times = CompactTimes::from_token_data(data)?;
        let project_id = project_id.filter(|p| !p.is_empty());

        let mut payload = Vec::with_capacity(5);
        payload.push(uuid_field(user_id)?);
        if let Some(project_id) = project_id {
            payload.push(uuid_field(project_id)?);
        }
        payload.extend(times.into_fields());

        let token = pack(&self.envelope, FORMAT, &payload)?;
        tracing::debug!(
            format = %FORMAT,
            user_id,
            scoped = project_id.is_some(),
            "Created token"
        );
        Ok(token)
    }

    /// Validate a standard token and rebuild its record.
    pub fn validate_token(&self, wire: &str) -> Result<ValidatedToken, TokenError> {
        let payload = unpack(&self.envelope, FORMAT, wire)?;

        let (user, project, issued_at, expires_at, audit) = match payload.as_slice() {
            [user, issued_at, expires_at, audit] => (user, None, issued_at, expires_at, audit),
            [user, project, issued_at, expires_at, audit] => {
                (user, Some(project), issued_at, expires_at, audit)
            }
            other => {
                return Err(TokenError::MalformedPayload(format!(
                    "{FORMAT} payload must have 4 or 5 fields, found {}",
                    other.len()
                )));
            }
        };

        let user_id = take_uuid(user, "user_id")?;
        let project_id = project
            .map(|p: &PayloadField| take_uuid(p, "project_id"))
            .transpose()?;
        let facts = TokenFacts {
            user_id: user_id.clone(),
            methods: self.methods.clone(),
            extras: Map::new(),
            project_id: project_id.clone(),
            expires_at: take_timestamp(expires_at, "expires_at")?,
            issued_at: take_timestamp(issued_at, "issued_at")?,
            trust: None,
            audit_info: take_audit(audit)?,
        };

        let record = self
            .expander
            .expand(facts)
            .map_err(TokenError::Collaborator)?;
        tracing::debug!(format = %FORMAT, user_id = %user_id, "Validated token");

        Ok(ValidatedToken {
            user_id,
            project_id,
            record,
        })
    }
}

impl std::fmt::Debug for StandardTokenFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardTokenFormatter")
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compact::AuditChain;
    use crate::expander::BasicExpander;
    use crate::keys::{KeyRing, StaticKeyRing, SymmetricKey};

    const USER: &str = "3a9e6b1c22f44d0e9b1a5c7d8e9f0a1b";
    const PROJECT: &str = "c0ffee00c0ffee00c0ffee00c0ffee00";

    fn formatter() -> StandardTokenFormatter {
        let keys = StaticKeyRing::new(KeyRing::new(vec![SymmetricKey::generate()]));
        StandardTokenFormatter::new(
            CryptoEnvelope::new(Arc::new(keys)),
            Arc::new(BasicExpander),
        )
    }

    fn token_data() -> TokenData {
        TokenData::new(
            "2024-01-01T00:00:00Z",
            "2024-01-01T01:00:00Z",
            vec!["abc123".to_string()],
        )
    }

    #[test]
    fn test_unscoped_roundtrip() {
        let formatter = formatter();
        let token = formatter.create_token(USER, None, &token_data()).unwrap();
        assert!(token.starts_with("F00"));

        let validated = formatter.validate_token(&token).unwrap();
        assert_eq!(validated.user_id, USER);
        assert_eq!(validated.project_id, None);
        assert_eq!(validated.record.issued_at, "2024-01-01T00:00:00Z");
        assert_eq!(validated.record.expires_at, "2024-01-01T01:00:00Z");
        assert_eq!(validated.record.audit_info, AuditChain::from("abc123"));
        assert_eq!(validated.record.methods, vec!["password", "token"]);
    }

    #[test]
    fn test_project_scoped_roundtrip() {
        let formatter = formatter();
        let token = formatter
            .create_token(USER, Some(PROJECT), &token_data())
            .unwrap();

        let validated = formatter.validate_token(&token).unwrap();
        assert_eq!(validated.project_id.as_deref(), Some(PROJECT));
        assert_eq!(validated.record.project_id.as_deref(), Some(PROJECT));
    }

    #[test]
    fn test_empty_project_is_unscoped() {
        let formatter = formatter();
        let token = formatter.create_token(USER, Some(""), &token_data()).unwrap();
        assert_eq!(formatter.validate_token(&token).unwrap().project_id, None);
    }

    #[test]
    fn test_audit_chain_kept_as_list() {
        let formatter = formatter();
        let data = token_data().with_parent_audit_id("parent");
        let token = formatter.create_token(USER, None, &data).unwrap();

        let validated = formatter.validate_token(&token).unwrap();
        assert_eq!(
            validated.record.audit_info,
            AuditChain::Chain(vec!["abc123".into(), "parent".into()])
        );
    }

    #[test]
    fn test_custom_methods() {
        let formatter = formatter().with_methods(vec!["totp".into()]);
        let token = formatter.create_token(USER, None, &token_data()).unwrap();
        assert_eq!(
            formatter.validate_token(&token).unwrap().record.methods,
            vec!["totp"]
        );
    }

    #[test]
    fn test_arity_decides_layout_not_content() {
        // A five-field payload whose second field is not a valid UUID is still
        // read as project-scoped, so the malformed project surfaces as an error.
        let formatter = formatter();
        let fields = vec![
            uuid_field(USER).unwrap(),
            PayloadField::Bytes(b"short".to_vec()),
            PayloadField::Integer(0),
            PayloadField::Integer(3600),
            PayloadField::Text("abc123".into()),
        ];
        let token = pack(&formatter.envelope, FORMAT, &fields).unwrap();
        assert!(matches!(
            formatter.validate_token(&token),
            Err(TokenError::MalformedValue(_))
        ));

        // A four-field payload is unscoped even when its second field holds bytes.
        let fields = vec![
            uuid_field(USER).unwrap(),
            PayloadField::Bytes(vec![0; 16]),
            PayloadField::Integer(3600),
            PayloadField::Text("abc123".into()),
        ];
        let token = pack(&formatter.envelope, FORMAT, &fields).unwrap();
        let err = formatter.validate_token(&token).unwrap_err();
        assert!(err.to_string().contains("issued_at"), "{err}");
    }

    #[test]
    fn test_wrong_arity_is_malformed() {
        let formatter = formatter();
        let fields = [uuid_field(USER).unwrap()];
        let token = pack(&formatter.envelope, FORMAT, &fields).unwrap();
        assert!(matches!(
            formatter.validate_token(&token),
            Err(TokenError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_rejects_trust_marker() {
        let formatter = formatter();
        let token = formatter.create_token(USER, None, &token_data()).unwrap();
        let relabeled = format!("F01{}", &token[3..]);
        assert!(matches!(
            formatter.validate_token(&relabeled),
            Err(TokenError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_bad_inputs() {
        let formatter = formatter();
        assert!(matches!(
            formatter.create_token("bob", None, &token_data()),
            Err(TokenError::MalformedValue(_))
        ));

        let mut data = token_data();
        data.expires_at = "tomorrow".into();
        assert!(matches!(
            formatter.create_token(USER, None, &data),
            Err(TokenError::MalformedValue(_))
        ));

        // Valid RFC 3339, but past the last renderable second once in UTC.
        data.expires_at = "9999-12-31T23:59:59-01:00".into();
        assert!(matches!(
            formatter.create_token(USER, None, &data),
            Err(TokenError::MalformedValue(_))
        ));
    }
}
