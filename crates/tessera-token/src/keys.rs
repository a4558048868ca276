//! Symmetric key material and key ring providers.
//!
//! A [`KeyRing`] is an ordered list of keys: the first key encrypts new tokens,
//! every key is tried when decrypting. Rings are immutable; rotation publishes a
//! whole new ring, so readers always see a consistent snapshot.

use crate::error::TokenError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tessera_core::KeyRingConfig;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of a symmetric key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// A 256-bit symmetric key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Create a key from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TokenError> {
        let bytes: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            TokenError::InvalidKey(format!(
                "expected {KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    /// Load a key from its base64url text form. Padding is optional.
    pub fn from_base64(encoded: &str) -> Result<Self, TokenError> {
        let raw = URL_SAFE_NO_PAD
            .decode(encoded.trim().trim_end_matches('='))
            .map_err(|e| TokenError::InvalidKey(e.to_string()))?;
        Self::from_bytes(&raw)
    }

    /// The base64url (unpadded) text form of the key.
    pub fn to_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.bytes)
    }

    /// Raw key bytes. Never log or persist these outside a key repository.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SymmetricKey([REDACTED])")
    }
}

/// Ordered set of active keys. Index 0 is the primary (encrypting) key.
#[derive(Debug, Clone, Default)]
pub struct KeyRing {
    keys: Vec<SymmetricKey>,
}

impl KeyRing {
    /// Build a ring from keys, primary first.
    pub fn new(keys: Vec<SymmetricKey>) -> Self {
        Self { keys }
    }

    /// Build a ring from base64url-encoded keys, primary first.
    pub fn from_encoded<S: AsRef<str>>(encoded: &[S]) -> Result<Self, TokenError> {
        let keys = encoded
            .iter()
            .map(|k| SymmetricKey::from_base64(k.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(keys))
    }

    /// The key used for new encryptions.
    pub fn primary(&self) -> Option<&SymmetricKey> {
        self.keys.first()
    }

    /// Iterate keys in decryption order.
    pub fn iter(&self) -> impl Iterator<Item = &SymmetricKey> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// A new ring with `key` promoted to primary and every current key demoted by one.
    pub fn rotate(&self, key: SymmetricKey) -> Self {
        let mut keys = Vec::with_capacity(self.keys.len() + 1);
        keys.push(key);
        keys.extend(self.keys.iter().cloned());
        Self { keys }
    }

    /// A new ring without the key at `index`. Out-of-range indexes leave the ring unchanged.
    pub fn without(&self, index: usize) -> Self {
        let keys = self
            .keys
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, k)| k.clone())
            .collect();
        Self { keys }
    }
}

/// Source of the active key ring.
///
/// Implementations must hand out immutable snapshots: a ring returned from
/// `load_keys` is never modified afterwards, even if the provider rotates.
pub trait KeyRingProvider: Send + Sync {
    /// Load the current ring. Fails with [`TokenError::KeysNotFound`] when it is empty.
    fn load_keys(&self) -> Result<Arc<KeyRing>, TokenError>;
}

fn non_empty(ring: Arc<KeyRing>) -> Result<Arc<KeyRing>, TokenError> {
    if ring.is_empty() {
        return Err(TokenError::KeysNotFound);
    }
    Ok(ring)
}

/// A fixed key ring.
#[derive(Debug, Clone)]
pub struct StaticKeyRing {
    ring: Arc<KeyRing>,
}

impl StaticKeyRing {
    pub fn new(ring: KeyRing) -> Self {
        Self {
            ring: Arc::new(ring),
        }
    }
}

impl KeyRingProvider for StaticKeyRing {
    fn load_keys(&self) -> Result<Arc<KeyRing>, TokenError> {
        non_empty(Arc::clone(&self.ring))
    }
}

/// A key ring that can be replaced at runtime.
///
/// `replace` swaps the whole snapshot under a write lock; readers clone the
/// `Arc` and keep using the ring they loaded.
#[derive(Debug, Default)]
pub struct SharedKeyRing {
    current: RwLock<Arc<KeyRing>>,
}

impl SharedKeyRing {
    pub fn new(ring: KeyRing) -> Self {
        Self {
            current: RwLock::new(Arc::new(ring)),
        }
    }

    /// Publish a new ring, returning the previous snapshot.
    pub fn replace(&self, ring: KeyRing) -> Arc<KeyRing> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(keys = ring.len(), "Key ring replaced");
        std::mem::replace(&mut *current, Arc::new(ring))
    }

    /// The current snapshot, empty or not.
    pub fn snapshot(&self) -> Arc<KeyRing> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }
}

impl KeyRingProvider for SharedKeyRing {
    fn load_keys(&self) -> Result<Arc<KeyRing>, TokenError> {
        non_empty(self.snapshot())
    }
}

/// Read-only view of a key repository directory.
///
/// Each key lives in a file named by a non-negative integer. The highest
/// index is the primary key; the rest follow in descending index order.
/// Files with other names are ignored.
#[derive(Debug)]
pub struct KeyRepository {
    path: PathBuf,
    ring: SharedKeyRing,
}

impl KeyRepository {
    /// Open a repository and load its keys.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TokenError> {
        let path = path.into();
        let ring = Self::read_ring(&path)?;
        tracing::info!(path = %path.display(), keys = ring.len(), "Loaded key repository");
        Ok(Self {
            path,
            ring: SharedKeyRing::new(ring),
        })
    }

    /// Re-read the directory and publish the new ring.
    pub fn reload(&self) -> Result<(), TokenError> {
        let ring = Self::read_ring(&self.path)?;
        self.ring.replace(ring);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_ring(path: &Path) -> Result<KeyRing, TokenError> {
        let mut indexed = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file_path = entry.path();
            if !file_path.is_file() {
                continue;
            }

            let index = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<u64>().ok());
            let Some(index) = index else {
                tracing::warn!(file = %file_path.display(), "Ignoring non-key file in key repository");
                continue;
            };

            let encoded = fs::read_to_string(&file_path)?;
            indexed.push((index, SymmetricKey::from_base64(&encoded)?));
        }

        indexed.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(KeyRing::new(indexed.into_iter().map(|(_, k)| k).collect()))
    }
}

impl KeyRingProvider for KeyRepository {
    fn load_keys(&self) -> Result<Arc<KeyRing>, TokenError> {
        self.ring.load_keys()
    }
}

/// Build a key ring provider from configuration.
///
/// A configured key repository takes precedence over encoded keys from the
/// environment or a keys file.
pub fn provider_from_config(
    config: &KeyRingConfig,
) -> Result<Arc<dyn KeyRingProvider>, TokenError> {
    if let Some(path) = &config.key_repository {
        return Ok(Arc::new(KeyRepository::open(path)?));
    }

    let encoded = config.resolve_encoded_keys()?.unwrap_or_default();
    let ring = KeyRing::from_encoded(&encoded)?;
    if ring.is_empty() {
        return Err(TokenError::KeysNotFound);
    }
    Ok(Arc::new(StaticKeyRing::new(ring)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_key_base64_roundtrip() {
        let key = SymmetricKey::generate();
        let encoded = key.to_base64();
        assert_eq!(encoded.len(), 43);

        let decoded = SymmetricKey::from_base64(&encoded).unwrap();
        assert_eq!(key.as_bytes(), decoded.as_bytes());

        // Padded form is accepted too
        let padded = SymmetricKey::from_base64(&format!("{encoded}=")).unwrap();
        assert_eq!(key.as_bytes(), padded.as_bytes());
    }

    #[test]
    fn test_key_wrong_length() {
        let err = SymmetricKey::from_bytes(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, TokenError::InvalidKey(_)));
        assert!(SymmetricKey::from_base64("not base64!").is_err());
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = SymmetricKey::generate();
        assert_eq!(format!("{key:?}"), "SymmetricKey([REDACTED])");
    }

    #[test]
    fn test_rotate_and_without() {
        let a = SymmetricKey::generate();
        let b = SymmetricKey::generate();
        let ring = KeyRing::new(vec![a.clone()]).rotate(b.clone());

        assert_eq!(ring.len(), 2);
        assert_eq!(ring.primary().unwrap().as_bytes(), b.as_bytes());

        let trimmed = ring.without(1);
        assert_eq!(trimmed.len(), 1);
        assert_eq!(trimmed.primary().unwrap().as_bytes(), b.as_bytes());
        assert_eq!(ring.without(7).len(), 2);
    }

    #[test]
    fn test_empty_providers_fail() {
        let err = StaticKeyRing::new(KeyRing::default()).load_keys().unwrap_err();
        assert!(matches!(err, TokenError::KeysNotFound));

        let err = SharedKeyRing::default().load_keys().unwrap_err();
        assert!(matches!(err, TokenError::KeysNotFound));
    }

    #[test]
    fn test_shared_ring_snapshots_survive_replace() {
        let shared = SharedKeyRing::new(KeyRing::new(vec![SymmetricKey::generate()]));
        let before = shared.load_keys().unwrap();

        shared.replace(before.rotate(SymmetricKey::generate()));

        assert_eq!(before.len(), 1);
        assert_eq!(shared.load_keys().unwrap().len(), 2);
    }

    #[test]
    fn test_key_repository_ordering() {
        let dir = tempdir().unwrap();
        let staged = SymmetricKey::generate();
        let secondary = SymmetricKey::generate();
        let primary = SymmetricKey::generate();

        fs::write(dir.path().join("0"), staged.to_base64()).unwrap();
        fs::write(dir.path().join("2"), format!("{}\n", secondary.to_base64())).unwrap();
        fs::write(dir.path().join("10"), primary.to_base64()).unwrap();
        fs::write(dir.path().join("README"), "not a key").unwrap();

        let repo = KeyRepository::open(dir.path()).unwrap();
        let ring = repo.load_keys().unwrap();
        let order: Vec<_> = ring.iter().map(SymmetricKey::to_base64).collect();
        assert_eq!(
            order,
            vec![
                primary.to_base64(),
                secondary.to_base64(),
                staged.to_base64()
            ]
        );
    }

    #[test]
    fn test_key_repository_reload() {
        let dir = tempdir().unwrap();
        let repo = KeyRepository::open(dir.path()).unwrap();
        assert!(matches!(repo.load_keys(), Err(TokenError::KeysNotFound)));

        fs::write(dir.path().join("1"), SymmetricKey::generate().to_base64()).unwrap();
        repo.reload().unwrap();
        assert_eq!(repo.load_keys().unwrap().len(), 1);
    }

    #[test]
    fn test_provider_from_config_repository() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("0"), SymmetricKey::generate().to_base64()).unwrap();

        let config = KeyRingConfig {
            key_repository: Some(dir.path().to_path_buf()),
            keys_env: None,
            keys_file: None,
        };
        let provider = provider_from_config(&config).unwrap();
        assert_eq!(provider.load_keys().unwrap().len(), 1);
    }

    #[test]
    fn test_provider_from_config_without_keys() {
        let config = KeyRingConfig {
            key_repository: None,
            keys_env: None,
            keys_file: None,
        };
        let err = provider_from_config(&config).err().unwrap();
        assert!(matches!(err, TokenError::KeysNotFound));
    }
}
