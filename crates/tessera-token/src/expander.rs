//! Expansion of token facts into the full token record.

use crate::claims::{TokenFacts, TokenRecord};

/// Rebuilds the rich token representation from the minimal facts a token carries.
///
/// Failures propagate out of token validation unchanged.
pub trait TokenMetadataExpander: Send + Sync {
    fn expand(&self, facts: TokenFacts) -> anyhow::Result<TokenRecord>;
}

/// Expander that copies the facts into the record and adds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicExpander;

impl TokenMetadataExpander for BasicExpander {
    fn expand(&self, facts: TokenFacts) -> anyhow::Result<TokenRecord> {
        Ok(TokenRecord::from(facts))
    }
}
