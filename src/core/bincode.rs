/*!
 * Binary Serialization with bincode
 * Encoding for payloads that cross the trust boundary as opaque byte extents
 */

use serde::{de::DeserializeOwned, Serialize};

/// Result type for bincode operations
pub type BincodeResult<T> = Result<T, BincodeError>;

/// Binary serialization errors
#[derive(Debug, thiserror::Error)]
pub enum BincodeError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

/// Serialize to binary bytes using bincode
#[inline]
pub fn to_vec<T: Serialize>(value: &T) -> BincodeResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| BincodeError::Serialization(e.to_string()))
}

/// Deserialize from binary bytes using bincode
///
/// Matches the output of `to_vec`.
#[inline]
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> BincodeResult<T> {
    bincode::deserialize(bytes).map_err(|e| BincodeError::Deserialization(e.to_string()))
}

/// Decode an output extent, treating an empty extent as the default value
///
/// Regions that have nothing to report leave the output extent empty rather
/// than encoding an empty record.
pub fn from_slice_or_default<T: DeserializeOwned + Default>(bytes: &[u8]) -> BincodeResult<T> {
    if bytes.is_empty() {
        return Ok(T::default());
    }
    from_slice(bytes)
}
