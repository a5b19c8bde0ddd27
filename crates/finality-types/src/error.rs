use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentHashError {
    #[error("invalid hex length: {0} (expected 64)")]
    InvalidLength(usize),

    #[error("invalid hex character at offset {0}")]
    InvalidHex(usize),
}

/// Canonical serialization failed before anything could be hashed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("canonical serialization failed: {0}")]
pub struct CanonicalError(pub String);

impl From<serde_json::Error> for CanonicalError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}
