#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend failure: {0}")]
    Backend(#[from] sled::Error),
    #[error("failed to encode value: {0}")]
    Encode(String),
    #[error("failed to decode value: {0}")]
    Decode(String),
    /// Bytes were found under `key` but do not decode to a valid value.
    #[error("corrupt value under key {key}: {reason}")]
    Corrupt { key: String, reason: String },
}
