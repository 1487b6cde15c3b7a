#![allow(dead_code)]

use backsync_core::{Block, Hash};
use backsync_storage::SledStore;
use std::fs;
use tempfile::{tempdir, TempDir};

pub fn create_temp_store() -> (TempDir, SledStore) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let store = SledStore::open(temp_dir.path()).expect("Failed to open SledStore");
    (temp_dir, store)
}

pub fn teardown_store(temp_dir: TempDir, store: SledStore) {
    let db_path = temp_dir.path().to_path_buf();
    store.clear().expect("Failed to clear the store");
    drop(store);
    temp_dir.close().expect("Failed to delete temp dir");
    let _ = fs::remove_dir_all(&db_path);
    assert!(!db_path.exists(), "Database directory should be removed");
}

/// `count` linked blocks starting at genesis, with distinct timestamps.
pub fn linked_blocks(count: u64) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    for number in 0..count {
        let parent: Hash = blocks.last().map(|b| b.hash()).unwrap_or([0u8; 32]);
        blocks.push(Block::new(number, parent, vec![], 1_600_000_000 + number, vec![]));
    }
    blocks
}
