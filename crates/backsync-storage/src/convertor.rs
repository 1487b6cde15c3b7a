//! Value encodings for the persisted sync tables.

use crate::StorageError;
use backsync_core::constants::HASH_SIZE;
use backsync_core::{Block, BlockHeader, Hash};

/// Encode/decode pair for one stored entity type.
///
/// `from_bytes(&to_bytes(v)?)? == v` must hold for every value written.
pub trait ValueConvertor<V>: Send + Sync {
    fn to_bytes(&self, value: &V) -> Result<Vec<u8>, StorageError>;
    fn from_bytes(&self, bytes: &[u8]) -> Result<V, StorageError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct HeaderConvertor;

impl ValueConvertor<BlockHeader> for HeaderConvertor {
    fn to_bytes(&self, value: &BlockHeader) -> Result<Vec<u8>, StorageError> {
        bincode::serialize(value).map_err(|e| StorageError::Encode(e.to_string()))
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<BlockHeader, StorageError> {
        bincode::deserialize(bytes).map_err(|e| StorageError::Decode(e.to_string()))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BlockConvertor;

impl ValueConvertor<Block> for BlockConvertor {
    fn to_bytes(&self, value: &Block) -> Result<Vec<u8>, StorageError> {
        bincode::serialize(value).map_err(|e| StorageError::Encode(e.to_string()))
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<Block, StorageError> {
        bincode::deserialize(bytes).map_err(|e| StorageError::Decode(e.to_string()))
    }
}

/// Hashes are stored as their raw 32 bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct HashConvertor;

impl ValueConvertor<Hash> for HashConvertor {
    fn to_bytes(&self, value: &Hash) -> Result<Vec<u8>, StorageError> {
        Ok(value.to_vec())
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<Hash, StorageError> {
        Hash::try_from(bytes).map_err(|_| {
            StorageError::Decode(format!("expected {HASH_SIZE} bytes, got {}", bytes.len()))
        })
    }
}
