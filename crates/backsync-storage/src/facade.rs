use crate::{KeyValueStorage, StorageError, ValueConvertor};
use backsync_core::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

/// Raw key bytes for hash-keyed tables.
pub fn hash_key(hash: &Hash) -> Vec<u8> {
    hash.to_vec()
}

/// Typed view over a [`KeyValueStorage`].
///
/// No caching: every call goes to the backing store. A value that is present
/// but fails to decode is reported as [`StorageError::Corrupt`], never as absent.
pub struct KeyValueStorageFacade<K, V> {
    key_bytes: fn(&K) -> Vec<u8>,
    convertor: Arc<dyn ValueConvertor<V>>,
    storage: Arc<dyn KeyValueStorage>,
    _key: PhantomData<fn(&K)>,
}

impl<K, V> Clone for KeyValueStorageFacade<K, V> {
    fn clone(&self) -> Self {
        Self {
            key_bytes: self.key_bytes,
            convertor: Arc::clone(&self.convertor),
            storage: Arc::clone(&self.storage),
            _key: PhantomData,
        }
    }
}

impl<K, V> KeyValueStorageFacade<K, V> {
    pub fn new(
        key_bytes: fn(&K) -> Vec<u8>,
        convertor: impl ValueConvertor<V> + 'static,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Self {
        Self {
            key_bytes,
            convertor: Arc::new(convertor),
            storage,
            _key: PhantomData,
        }
    }

    pub fn put(&self, key: &K, value: &V) -> Result<(), StorageError> {
        let bytes = self.convertor.to_bytes(value)?;
        self.storage.put(&(self.key_bytes)(key), bytes)
    }

    pub fn get(&self, key: &K) -> Result<Option<V>, StorageError> {
        let raw_key = (self.key_bytes)(key);
        match self.storage.get(&raw_key)? {
            Some(bytes) => self
                .convertor
                .from_bytes(&bytes)
                .map(Some)
                .map_err(|e| StorageError::Corrupt {
                    key: hex::encode(&raw_key),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    pub fn remove(&self, key: &K) -> Result<(), StorageError> {
        self.storage.remove(&(self.key_bytes)(key))
    }

    pub fn contains(&self, key: &K) -> Result<bool, StorageError> {
        self.storage.contains_key(&(self.key_bytes)(key))
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.clear()
    }
}
