//! Token issuance and validation across all formats.

use crate::claims::{TokenData, ValidatedToken};
use crate::envelope::CryptoEnvelope;
use crate::error::TokenError;
use crate::expander::TokenMetadataExpander;
use crate::formatter::{StandardTokenFormatter, TokenFormat, TrustTokenFormatter};
use crate::keys::KeyRingProvider;
use crate::trust::TrustLookup;
use std::sync::Arc;

/// Issues tokens in the right format and routes validation by format marker.
#[derive(Debug, Clone)]
pub struct TokenProvider {
    standard: StandardTokenFormatter,
    trust: TrustTokenFormatter,
}

impl TokenProvider {
    pub fn new(
        keys: Arc<dyn KeyRingProvider>,
        trusts: Arc<dyn TrustLookup>,
        expander: Arc<dyn TokenMetadataExpander>,
    ) -> Self {
        let envelope = CryptoEnvelope::new(keys);
        Self {
            standard: StandardTokenFormatter::new(envelope.clone(), Arc::clone(&expander)),
            trust: TrustTokenFormatter::new(envelope, trusts, expander),
        }
    }

    /// Override the authentication methods reported for validated tokens.
    pub fn with_methods(self, methods: Vec<String>) -> Self {
        Self {
            standard: self.standard.with_methods(methods.clone()),
            trust: self.trust.with_methods(methods),
        }
    }

    /// The format a token for `data` will be issued in.
    pub fn format_for(data: &TokenData) -> TokenFormat {
        if data.trust.is_some() {
            TokenFormat::Trust
        } else {
            TokenFormat::Standard
        }
    }

    /// Issue a token. Trust-delegated data yields a trust token, anything else a standard one.
    pub fn issue_token(
        &self,
        user_id: &str,
        project_id: Option<&str>,
        data: &TokenData,
    ) -> Result<String, TokenError> {
        match Self::format_for(data) {
            TokenFormat::Standard => self.standard.create_token(user_id, project_id, data),
            TokenFormat::Trust => self.trust.create_token(user_id, project_id, data),
        }
    }

    /// Validate a token of any registered format.
    pub fn validate_token(&self, wire: &str) -> Result<ValidatedToken, TokenError> {
        let (format, _) = TokenFormat::split(wire)?;
        match format {
            TokenFormat::Standard => self.standard.validate_token(wire),
            TokenFormat::Trust => self.trust.validate_token(wire),
        }
    }

    pub fn standard(&self) -> &StandardTokenFormatter {
        &self.standard
    }

    pub fn trust(&self) -> &TrustTokenFormatter {
        &self.trust
    }
}
