/// Raw audio assets and their content hashes
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Shared, immutable audio file bytes
///
/// Decoders borrow these; the same bytes can be decoded any number of times.
pub type AssetBytes = Arc<[u8]>;

/// Hex-encoded SHA-256 digest of an asset's raw bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash raw bytes
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// Get the hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable raw audio file plus its display name
///
/// Cloning is cheap: the bytes and the lazily computed hash are shared.
#[derive(Clone)]
pub struct AudioAsset {
    name: String,
    bytes: AssetBytes,
    hash: Arc<OnceLock<ContentHash>>,
}

impl AudioAsset {
    /// Create a new asset
    pub fn new(name: impl Into<String>, bytes: impl Into<AssetBytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            hash: Arc::new(OnceLock::new()),
        }
    }

    /// Display name (the original file name)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to the raw bytes
    pub fn bytes(&self) -> AssetBytes {
        Arc::clone(&self.bytes)
    }

    /// Size of the raw data in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the asset holds no data
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// SHA-256 of the raw bytes, computed on first use and cached
    pub fn content_hash(&self) -> &ContentHash {
        self.hash.get_or_init(|| {
            tracing::debug!("Hashing {} ({} bytes)", self.name, self.bytes.len());
            ContentHash::of(&self.bytes)
        })
    }
}

impl fmt::Debug for AudioAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioAsset")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .field("hash", &self.hash.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_matches_known_digest() {
        // SHA-256("abc")
        let hash = ContentHash::of(b"abc");
        assert_eq!(
            hash.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn hash_is_lazy_and_shared_between_clones() {
        let asset = AudioAsset::new("a.wav", vec![1u8, 2, 3]);
        let clone = asset.clone();
        assert!(asset.hash.get().is_none());

        let first = asset.content_hash().clone();
        assert_eq!(clone.hash.get(), Some(&first));
        assert_eq!(clone.content_hash(), &first);
    }

    #[test]
    fn different_bytes_hash_differently() {
        let a = AudioAsset::new("a.wav", vec![1u8, 2, 3]);
        let b = AudioAsset::new("a.wav", vec![1u8, 2, 4]);
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn bytes_are_shared_not_copied() {
        let asset = AudioAsset::new("a.wav", vec![9u8; 32]);
        let one = asset.bytes();
        let two = asset.bytes();
        assert!(Arc::ptr_eq(&one, &two));
        assert_eq!(asset.len(), 32);
    }
}
