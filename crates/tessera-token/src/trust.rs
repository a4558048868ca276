//! Trust lookup used when validating trust-scoped tokens.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use uuid::Uuid;

/// A resolved trust (delegation from a trustor to a trustee).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustRef {
    pub id: String,

    #[serde(default)]
    pub trustor_user_id: Option<String>,

    #[serde(default)]
    pub trustee_user_id: Option<String>,

    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default)]
    pub impersonation: bool,

    #[serde(default)]
    pub expires_at: Option<String>,
}

impl TrustRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            trustor_user_id: None,
            trustee_user_id: None,
            project_id: None,
            impersonation: false,
            expires_at: None,
        }
    }
}

/// Resolves trust ids. Failures propagate out of token validation unchanged.
pub trait TrustLookup: Send + Sync {
    fn get_trust(&self, trust_id: &str) -> anyhow::Result<TrustRef>;
}

/// The trust does not exist (or has been revoked).
#[derive(Debug, Error)]
#[error("trust not found: {0}")]
pub struct TrustNotFound(pub String);

/// Trusts held in memory.
#[derive(Debug, Default)]
pub struct InMemoryTrustStore {
    trusts: RwLock<HashMap<String, TrustRef>>,
}

impl InMemoryTrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_trusts(trusts: impl IntoIterator<Item = TrustRef>) -> Self {
        let store = Self::new();
        for trust in trusts {
            store.insert(trust);
        }
        store
    }

    pub fn insert(&self, trust: TrustRef) {
        let mut trusts = self.trusts.write().unwrap_or_else(PoisonError::into_inner);
        trusts.insert(normalize(&trust.id), trust);
    }

    /// Remove a trust. Returns whether it existed.
    pub fn revoke(&self, trust_id: &str) -> bool {
        let mut trusts = self.trusts.write().unwrap_or_else(PoisonError::into_inner);
        trusts.remove(&normalize(trust_id)).is_some()
    }

    pub fn len(&self) -> usize {
        self.trusts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TrustLookup for InMemoryTrustStore {
    fn get_trust(&self, trust_id: &str) -> anyhow::Result<TrustRef> {
        let trusts = self.trusts.read().unwrap_or_else(PoisonError::into_inner);
        trusts
            .get(&normalize(trust_id))
            .cloned()
            .ok_or_else(|| TrustNotFound(trust_id.to_string()).into())
    }
}

// Hyphenated and simple UUID forms refer to the same trust.
fn normalize(id: &str) -> String {
    Uuid::parse_str(id)
        .map(|u| u.simple().to_string())
        .unwrap_or_else(|_| id.to_string())
}
