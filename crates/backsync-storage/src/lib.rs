//! Persistence for the canonical chain and for in-progress sync segments.
//!
//! [`KeyValueStorage`] is the untyped byte store; [`KeyValueStorageFacade`]
//! layers a key extraction function and a [`ValueConvertor`] over it so callers
//! deal in headers, blocks and hashes only.

pub mod convertor;
pub mod error;
pub mod facade;
pub mod kv;
pub mod sled_store;

pub use convertor::{BlockConvertor, HashConvertor, HeaderConvertor, ValueConvertor};
pub use error::StorageError;
pub use facade::{hash_key, KeyValueStorageFacade};
pub use kv::{InMemoryKeyValueStorage, KeyValueStorage, SledKeyValueStorage};
pub use sled_store::SledStore;
