use backsync_core::Hash;
use backsync_storage::StorageError;

/// Failure of a single request to a peer. Retried by the caller.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("peer responded with status {0}")]
    Status(u16),
    #[error("undecodable response: {0}")]
    Decode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("max retries reached: {attempts} attempts for {}", hex::encode(.hash))]
    MaxRetriesReached { hash: Hash, attempts: u32 },

    #[error(
        "header {} does not link to the frontier, expected {}",
        hex::encode(.actual),
        hex::encode(.expected)
    )]
    Linkage { expected: Hash, actual: Hash },

    #[error("ancestor at height {actual} cannot precede frontier at height {frontier}")]
    HeightGap { frontier: u64, actual: u64 },

    #[error("entry stored under {} hashes to {}", hex::encode(.key), hex::encode(.actual))]
    HashMismatch { key: Hash, actual: Hash },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("local chain lookup failed: {0:#}")]
    LocalChain(anyhow::Error),

    #[error("block import failed: {0:#}")]
    Import(anyhow::Error),

    #[error("backward chain is empty")]
    EmptyChain,

    #[error("reached genesis {} without connecting to the local chain", hex::encode(.0))]
    GenesisMismatch(Hash),

    #[error("frontier {} is not part of the local chain yet", hex::encode(.0))]
    NotConnected(Hash),

    #[error("no successor recorded for {}", hex::encode(.0))]
    MissingSuccessor(Hash),
}
