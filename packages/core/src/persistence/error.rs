//! Persistence Error Types
//!
//! None of these block the editor. Hydration errors degrade to a cache miss,
//! cache write errors are logged, and backend errors only surface through the
//! save indicator or a non-blocking hydration notice.

use thiserror::Error;

/// A stored snapshot could not be turned back into a graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HydrationError {
    /// Payload is not valid snapshot JSON
    #[error("Failed to parse snapshot: {0}")]
    Parse(String),

    /// Payload was written by a newer build
    #[error("Snapshot schema version {found} is newer than supported version {supported}")]
    UnsupportedSchemaVersion { found: u32, supported: u32 },

    /// Cache entry exists but cannot be read
    #[error("Corrupt cache entry {key}: {reason}")]
    CorruptCache { key: String, reason: String },
}

impl HydrationError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn corrupt_cache(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptCache {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Local cache write failures
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize snapshot: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

/// Backend call failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// Network or server error
    #[error("Backend request failed: {0}")]
    RequestFailed(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Backend payload could not be (de)serialized: {0}")]
    Serialization(String),

    #[error("Backend state lock poisoned")]
    LockPoisoned,
}

impl PersistenceError {
    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            HydrationError::UnsupportedSchemaVersion {
                found: 7,
                supported: 1
            }
            .to_string(),
            "Snapshot schema version 7 is newer than supported version 1"
        );
        assert_eq!(
            PersistenceError::request_failed("503").to_string(),
            "Backend request failed: 503"
        );
    }

    #[test]
    fn test_cache_error_from_io() {
        let err: CacheError = std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert!(matches!(err, CacheError::Io(_)));
    }
}
