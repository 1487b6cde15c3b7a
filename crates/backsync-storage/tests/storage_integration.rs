mod helpers;

use backsync_core::chain::{Chain, ChainStore};
use backsync_core::{Block, BlockHeader, Hash, Transaction};
use backsync_storage::{
    hash_key, BlockConvertor, HashConvertor, HeaderConvertor, KeyValueStorage,
    KeyValueStorageFacade, SledStore, StorageError,
};
use helpers::{create_temp_store, linked_blocks, teardown_store};
use rand::Rng;
use std::sync::Arc;
use tempfile::tempdir;

#[tokio::test]
async fn test_chain_store_by_number_and_hash() -> anyhow::Result<()> {
    let (temp_dir, store) = create_temp_store();
    let blocks = linked_blocks(100);
    for block in &blocks {
        store.put_block(block)?;
    }
    for block in &blocks {
        let number = block.header.number;
        let by_number = store.get_block(number)?.expect("Block should exist");
        assert_eq!(&by_number, block);
        let by_hash = store
            .get_block_by_hash(&block.hash())?
            .expect("Block should be indexed by hash");
        assert_eq!(by_hash.header.number, number);
        assert_eq!(store.get_block_hash_by_number(number)?, Some(block.hash()));
        assert_eq!(store.get_block_header(&block.hash())?, Some(block.header.clone()));
    }
    assert_eq!(store.tip_height()?, 99);
    assert_eq!(store.tip_hash()?, Some(blocks[99].hash()));
    teardown_store(temp_dir, store);
    Ok(())
}

#[tokio::test]
async fn test_chain_store_empty_database() -> anyhow::Result<()> {
    let (temp_dir, store) = create_temp_store();
    assert_eq!(store.tip_height()?, 0);
    assert!(store.tip_hash()?.is_none(), "Tip hash should be None for empty database");
    assert!(store.get_block(0)?.is_none());
    assert!(store.get_block_by_hash(&[1u8; 32])?.is_none());
    assert!(store.get_block_header(&[1u8; 32])?.is_none());
    teardown_store(temp_dir, store);
    Ok(())
}

#[tokio::test]
async fn test_chain_store_persistence() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let blocks = linked_blocks(5);
    {
        let store = SledStore::open(temp_dir.path())?;
        let chain = Chain::new(Arc::new(store));
        chain.ensure_genesis()?;
        for block in &blocks[1..] {
            // Genesis differs from the helper's, so link on the chain's real tip.
            let tip = chain.tip()?.1.expect("tip");
            let linked = Block::new(block.header.number, tip, vec![], block.header.timestamp, vec![]);
            chain.append_block(&linked)?;
        }
        chain.store().close()?;
    }
    {
        let store = SledStore::open(temp_dir.path())?;
        assert_eq!(store.tip_height()?, 4);
        let tip = store.tip_hash()?.expect("Tip hash should exist");
        let header = store.get_block_header(&tip)?.expect("tip header");
        assert_eq!(header.number, 4);
        let parent = store.get_block_header(&header.parent_hash)?.expect("parent header");
        assert_eq!(parent.number, 3);
    }
    temp_dir.close()?;
    Ok(())
}

#[tokio::test]
async fn test_chain_store_large_transactions() -> anyhow::Result<()> {
    let (temp_dir, store) = create_temp_store();
    let large_txs: Vec<Transaction> = (0..1000)
        .map(|i| Transaction {
            from: "a".repeat(1000) + &i.to_string(),
            to: "b".repeat(1000) + &i.to_string(),
            amount: i as u64,
            timestamp: 1_600_000_000 + i as u64,
        })
        .collect();
    let block = Block::new(0, [0u8; 32], large_txs.clone(), 0, vec![]);
    store.put_block(&block)?;
    let retrieved = store.get_block_by_hash(&block.hash())?.expect("Block should exist");
    assert_eq!(retrieved.txs, large_txs);
    teardown_store(temp_dir, store);
    Ok(())
}

#[tokio::test]
async fn test_chain_store_concurrent_readers() -> anyhow::Result<()> {
    let (temp_dir, store) = create_temp_store();
    let store = Arc::new(store);
    let blocks = linked_blocks(50);
    for block in &blocks {
        store.put_block(block)?;
    }
    let mut handles = Vec::new();
    for block in blocks.clone() {
        let store = Arc::clone(&store);
        handles.push(tokio::task::spawn(async move {
            let found = store.get_block_by_hash(&block.hash()).unwrap().unwrap();
            assert_eq!(found.header.number, block.header.number);
        }));
    }
    for handle in handles {
        handle.await?;
    }
    drop(store);
    temp_dir.close()?;
    Ok(())
}

#[tokio::test]
async fn test_facade_over_sled_survives_reopen() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let mut rng = rand::thread_rng();
    let header = BlockHeader::new(7, rng.gen(), rng.gen(), rng.gen());
    let successor: Hash = rng.gen();
    {
        let store = SledStore::open(temp_dir.path())?;
        let headers: KeyValueStorageFacade<Hash, BlockHeader> =
            KeyValueStorageFacade::new(hash_key, HeaderConvertor, Arc::new(store.kv_tree("headers")?));
        let links: KeyValueStorageFacade<Hash, Hash> =
            KeyValueStorageFacade::new(hash_key, HashConvertor, Arc::new(store.kv_tree("chain")?));
        headers.put(&header.hash(), &header)?;
        links.put(&header.hash(), &successor)?;
    }
    {
        let store = SledStore::open(temp_dir.path())?;
        let headers: KeyValueStorageFacade<Hash, BlockHeader> =
            KeyValueStorageFacade::new(hash_key, HeaderConvertor, Arc::new(store.kv_tree("headers")?));
        let links: KeyValueStorageFacade<Hash, Hash> =
            KeyValueStorageFacade::new(hash_key, HashConvertor, Arc::new(store.kv_tree("chain")?));
        assert_eq!(headers.get(&header.hash())?, Some(header.clone()));
        assert_eq!(links.get(&header.hash())?, Some(successor));
        links.remove(&header.hash())?;
        assert_eq!(links.get(&header.hash())?, None);
    }
    temp_dir.close()?;
    Ok(())
}

#[tokio::test]
async fn test_facade_reports_corrupt_block() -> anyhow::Result<()> {
    let (temp_dir, store) = create_temp_store();
    let raw = Arc::new(store.kv_tree("blocks_by_hash")?);
    let blocks: KeyValueStorageFacade<Hash, Block> =
        KeyValueStorageFacade::new(hash_key, BlockConvertor, raw.clone());
    let block = linked_blocks(1).remove(0);
    blocks.put(&block.hash(), &block)?;
    raw.put(&block.hash(), vec![0xff; 3])?;
    let err = blocks.get(&block.hash()).unwrap_err();
    assert!(matches!(err, StorageError::Corrupt { .. }), "got {err:?}");
    assert!(blocks.contains(&block.hash())?);
    drop(blocks);
    drop(raw);
    teardown_store(temp_dir, store);
    Ok(())
}

#[tokio::test]
async fn test_clear_removes_blocks_and_tip() -> anyhow::Result<()> {
    let (temp_dir, store) = create_temp_store();
    for block in &linked_blocks(3) {
        store.put_block(block)?;
    }
    store.clear()?;
    assert!(store.get_block(1)?.is_none());
    assert!(store.tip_hash()?.is_none());
    teardown_store(temp_dir, store);
    Ok(())
}
