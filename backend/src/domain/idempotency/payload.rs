//! Payload canonicalisation and hashing.

use std::fmt;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Errors raised when rebuilding a [`PayloadHash`] from stored bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadHashError {
    /// The byte slice had the wrong length.
    #[error("payload hash must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes.
        actual: usize,
    },
}

/// SHA-256 hash of a canonicalised request payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PayloadHash([u8; 32]);

impl PayloadHash {
    /// Rebuild a hash from stored bytes.
    ///
    /// ```
    /// # use gigzz_backend::domain::PayloadHash;
    /// assert!(PayloadHash::try_from_bytes(&[0u8; 32]).is_ok());
    /// assert!(PayloadHash::try_from_bytes(&[0u8; 4]).is_err());
    /// ```
    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, PayloadHashError> {
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| PayloadHashError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hexadecimal form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for PayloadHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Canonicalise a JSON value and hash it.
///
/// Object keys are sorted recursively, arrays keep their order, and the
/// compact serialisation is hashed with SHA-256.
///
/// ```
/// # use gigzz_backend::domain::canonicalize_and_hash;
/// # use serde_json::json;
/// let a = canonicalize_and_hash(&json!({"tier": "Gold", "jobId": "x"}));
/// let b = canonicalize_and_hash(&json!({"jobId": "x", "tier": "Gold"}));
/// assert_eq!(a, b);
/// ```
pub fn canonicalize_and_hash(value: &Value) -> PayloadHash {
    let canonical = canonicalize(value).to_string();
    PayloadHash(Sha256::digest(canonical.as_bytes()).into())
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by_key(|(key, _)| key.as_str());
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, nested)| (key.clone(), canonicalize(nested)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
