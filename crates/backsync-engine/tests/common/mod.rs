#![allow(dead_code)]

use async_trait::async_trait;
use backsync_core::chain::{Chain, ChainStore};
use backsync_core::{Block, BlockHeader, Hash, Transaction};
use backsync_engine::{
    BackwardChain, BlockFetcher, HeaderFetcher, LocalChain, PeerError, PeerNetwork, SyncConfig,
    SyncContext,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const REMOTE_HEIGHT: u64 = 50;
pub const LOCAL_HEIGHT: u64 = 25;
pub const BATCH_SIZE: u32 = 5;
pub const MAX_RETRIES: u32 = 4;

#[derive(Default)]
pub struct MemoryChainStore {
    blocks: Mutex<Vec<Block>>,
    by_hash: Mutex<HashMap<Hash, u64>>,
    header_lookups: AtomicUsize,
}

impl MemoryChainStore {
    pub fn header_lookups(&self) -> usize {
        self.header_lookups.load(Ordering::SeqCst)
    }
}

impl ChainStore for MemoryChainStore {
    fn put_block(&self, block: &Block) -> anyhow::Result<()> {
        let mut blocks = self.blocks.lock().unwrap();
        let number = block.header.number as usize;
        blocks.truncate(number);
        blocks.push(block.clone());
        self.by_hash
            .lock()
            .unwrap()
            .insert(block.hash(), block.header.number);
        Ok(())
    }

    fn get_block(&self, number: u64) -> anyhow::Result<Option<Block>> {
        Ok(self.blocks.lock().unwrap().get(number as usize).cloned())
    }

    fn get_block_by_hash(&self, hash: &Hash) -> anyhow::Result<Option<Block>> {
        let number = self.by_hash.lock().unwrap().get(hash).copied();
        Ok(match number {
            Some(n) => self.get_block(n)?.filter(|b| &b.hash() == hash),
            None => None,
        })
    }

    fn get_block_header(&self, hash: &Hash) -> anyhow::Result<Option<BlockHeader>> {
        self.header_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.get_block_by_hash(hash)?.map(|b| b.header))
    }

    fn get_block_hash_by_number(&self, number: u64) -> anyhow::Result<Option<Hash>> {
        Ok(self.get_block(number)?.map(|b| b.hash()))
    }

    fn tip_height(&self) -> anyhow::Result<u64> {
        Ok(self.blocks.lock().unwrap().len().saturating_sub(1) as u64)
    }

    fn tip_hash(&self) -> anyhow::Result<Option<Hash>> {
        Ok(self.blocks.lock().unwrap().last().map(|b| b.hash()))
    }

    fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

pub type MemoryChain = Chain<MemoryChainStore>;

/// Second handle onto the same store.
pub fn share(chain: &MemoryChain) -> MemoryChain {
    Chain::new(Arc::clone(chain.store()))
}

pub fn new_chain() -> MemoryChain {
    let chain = Chain::new(Arc::new(MemoryChainStore::default()));
    chain.ensure_genesis().unwrap();
    chain
}

/// Append blocks on `chain` until its head is `height`. `salt` makes blocks of
/// different chains distinct at the same height.
pub fn extend_chain(chain: &MemoryChain, height: u64, salt: &[u8]) {
    let (current, _) = chain.tip().unwrap();
    for number in current + 1..=height {
        let parent = chain.store().get_block_hash_by_number(number - 1).unwrap().unwrap();
        let txs = vec![Transaction {
            from: format!("sender-{number}"),
            to: "receiver".into(),
            amount: number,
            timestamp: 1_600_000_000 + number,
        }];
        let block = Block::new(number, parent, txs, 1_600_000_000 + number, salt.to_vec());
        chain.append_block(&block).unwrap();
    }
}

/// Remote chain at [`REMOTE_HEIGHT`] and a local chain sharing its first
/// [`LOCAL_HEIGHT`] blocks.
pub fn remote_and_local() -> (MemoryChain, MemoryChain) {
    let remote = new_chain();
    extend_chain(&remote, REMOTE_HEIGHT, b"remote");
    let local = new_chain();
    for number in 1..=LOCAL_HEIGHT {
        local
            .append_block(&remote.store().get_block(number).unwrap().unwrap())
            .unwrap();
    }
    (remote, local)
}

pub fn block_by_number(chain: &MemoryChain, number: u64) -> Block {
    chain.store().get_block(number).unwrap().unwrap()
}

/// Segment anchored at remote block `until`, with headers down to `from`
/// already prepended.
pub fn backward_chain_from(remote: &MemoryChain, from: u64, until: u64) -> Arc<BackwardChain> {
    let chain = BackwardChain::in_memory();
    chain
        .append_trusted_block(&block_by_number(remote, until))
        .unwrap();
    for number in (from..until).rev() {
        chain
            .prepend_ancestors_header(&block_by_number(remote, number).header)
            .unwrap();
    }
    Arc::new(chain)
}

pub fn backward_chain(remote: &MemoryChain, anchor: u64) -> Arc<BackwardChain> {
    backward_chain_from(remote, anchor, anchor)
}

/// Serves headers and blocks from a chain, like an honest peer.
pub struct ChainResponder {
    chain: MemoryChain,
    pub header_requests: AtomicUsize,
    pub block_requests: AtomicUsize,
}

impl ChainResponder {
    pub fn new(chain: MemoryChain) -> Self {
        Self {
            chain,
            header_requests: AtomicUsize::new(0),
            block_requests: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl HeaderFetcher for ChainResponder {
    async fn get_headers_by_hash(
        &self,
        hash: Hash,
        limit: u32,
    ) -> Result<Vec<BlockHeader>, PeerError> {
        self.header_requests.fetch_add(1, Ordering::SeqCst);
        self.chain
            .headers_descending(&hash, limit as usize)
            .map_err(|e| PeerError::Transport(e.to_string()))
    }
}

#[async_trait]
impl BlockFetcher for ChainResponder {
    async fn get_block_by_hash(&self, hash: Hash) -> Result<Option<Block>, PeerError> {
        self.block_requests.fetch_add(1, Ordering::SeqCst);
        self.chain
            .store()
            .get_block_by_hash(&hash)
            .map_err(|e| PeerError::Transport(e.to_string()))
    }
}

/// Answers every request with nothing.
#[derive(Default)]
pub struct EmptyResponder {
    pub requests: AtomicUsize,
}

#[async_trait]
impl HeaderFetcher for EmptyResponder {
    async fn get_headers_by_hash(
        &self,
        _hash: Hash,
        _limit: u32,
    ) -> Result<Vec<BlockHeader>, PeerError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(vec![])
    }
}

#[async_trait]
impl BlockFetcher for EmptyResponder {
    async fn get_block_by_hash(&self, _hash: Hash) -> Result<Option<Block>, PeerError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

/// Context whose network handle is counted, so tests can assert it was never
/// asked for.
pub struct TestContext {
    local: MemoryChain,
    network: Arc<dyn PeerNetwork>,
    config: SyncConfig,
    network_handles: AtomicUsize,
}

impl TestContext {
    pub fn new(local: MemoryChain, network: Arc<dyn PeerNetwork>) -> Self {
        Self {
            local,
            network,
            config: SyncConfig {
                batch_size: BATCH_SIZE,
                max_retries: MAX_RETRIES,
                retry_delay_ms: 0,
            },
            network_handles: AtomicUsize::new(0),
        }
    }

    pub fn network_handles(&self) -> usize {
        self.network_handles.load(Ordering::SeqCst)
    }

    pub fn local(&self) -> &MemoryChain {
        &self.local
    }
}

impl SyncContext for TestContext {
    fn local_chain(&self) -> &dyn LocalChain {
        &self.local
    }

    fn network(&self) -> Arc<dyn PeerNetwork> {
        self.network_handles.fetch_add(1, Ordering::SeqCst);
        Arc::clone(&self.network)
    }

    fn config(&self) -> &SyncConfig {
        &self.config
    }
}
