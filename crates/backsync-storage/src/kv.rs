use crate::StorageError;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Untyped byte-keyed, byte-valued store.
///
/// Writes are durable once the call returns; implementations must not buffer.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;
    fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), StorageError>;
    /// Removing a missing key is a no-op.
    fn remove(&self, key: &[u8]) -> Result<(), StorageError>;
    fn contains_key(&self, key: &[u8]) -> Result<bool, StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

#[derive(Default)]
pub struct InMemoryKeyValueStorage {
    entries: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKeyValueStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStorage for InMemoryKeyValueStorage {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_vec(), value);
        Ok(())
    }

    fn remove(&self, key: &[u8]) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }

    fn contains_key(&self, key: &[u8]) -> Result<bool, StorageError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.contains_key(key))
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
        Ok(())
    }
}

/// One sled tree exposed as a [`KeyValueStorage`]. Every write is flushed.
#[derive(Clone)]
pub struct SledKeyValueStorage {
    tree: sled::Tree,
}

impl SledKeyValueStorage {
    pub fn new(tree: sled::Tree) -> Self {
        Self { tree }
    }
}

impl KeyValueStorage for SledKeyValueStorage {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.tree.get(key)?.map(|v| v.to_vec()))
    }

    fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), StorageError> {
        self.tree.insert(key, value)?;
        self.tree.flush()?;
        Ok(())
    }

    fn remove(&self, key: &[u8]) -> Result<(), StorageError> {
        if self.tree.remove(key)?.is_some() {
            self.tree.flush()?;
        }
        Ok(())
    }

    fn contains_key(&self, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.tree.contains_key(key)?)
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.tree.clear()?;
        self.tree.flush()?;
        Ok(())
    }
}
