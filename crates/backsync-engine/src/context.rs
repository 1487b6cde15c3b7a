use crate::{PeerError, SyncConfig};
use async_trait::async_trait;
use backsync_core::chain::{Chain, ChainStore};
use backsync_core::{Block, BlockHeader, Hash};
use std::sync::Arc;

/// Read-only view of the local canonical chain. Misses are `Ok(None)`.
pub trait LocalChain: Send + Sync {
    fn block_header(&self, hash: &Hash) -> anyhow::Result<Option<BlockHeader>>;
    fn block_hash_by_number(&self, number: u64) -> anyhow::Result<Option<Hash>>;
    fn chain_head_block_number(&self) -> anyhow::Result<u64>;
}

impl<S: ChainStore> LocalChain for Chain<S> {
    fn block_header(&self, hash: &Hash) -> anyhow::Result<Option<BlockHeader>> {
        self.store().get_block_header(hash)
    }

    fn block_hash_by_number(&self, number: u64) -> anyhow::Result<Option<Hash>> {
        self.store().get_block_hash_by_number(number)
    }

    fn chain_head_block_number(&self) -> anyhow::Result<u64> {
        self.store().tip_height()
    }
}

/// Single-attempt header request against some connected peer.
#[async_trait]
pub trait HeaderFetcher: Send + Sync {
    /// Up to `limit` headers starting at `hash`, descending. Empty when the
    /// peer does not know `hash`.
    async fn get_headers_by_hash(
        &self,
        hash: Hash,
        limit: u32,
    ) -> Result<Vec<BlockHeader>, PeerError>;
}

/// Single-attempt block body request.
#[async_trait]
pub trait BlockFetcher: Send + Sync {
    async fn get_block_by_hash(&self, hash: Hash) -> Result<Option<Block>, PeerError>;
}

pub trait PeerNetwork: HeaderFetcher + BlockFetcher {}

impl<T: HeaderFetcher + BlockFetcher> PeerNetwork for T {}

/// Appends blocks to canonical storage in ascending order.
pub trait BlockImporter: Send + Sync {
    fn import_block(&self, block: &Block) -> anyhow::Result<()>;
}

impl<S: ChainStore> BlockImporter for Chain<S> {
    fn import_block(&self, block: &Block) -> anyhow::Result<()> {
        self.append_block(block)
    }
}

/// Everything a step needs from the outside world.
pub trait SyncContext: Send + Sync {
    fn local_chain(&self) -> &dyn LocalChain;
    /// Handle to the peer network. Only requested when a fetch actually has to
    /// leave the node.
    fn network(&self) -> Arc<dyn PeerNetwork>;
    fn config(&self) -> &SyncConfig;
}

pub struct BackwardSyncContext<L> {
    local: L,
    network: Arc<dyn PeerNetwork>,
    config: SyncConfig,
}

impl<L: LocalChain> BackwardSyncContext<L> {
    pub fn new(local: L, network: Arc<dyn PeerNetwork>, config: SyncConfig) -> Self {
        Self {
            local,
            network,
            config,
        }
    }
}

impl<L: LocalChain> SyncContext for BackwardSyncContext<L> {
    fn local_chain(&self) -> &dyn LocalChain {
        &self.local
    }

    fn network(&self) -> Arc<dyn PeerNetwork> {
        Arc::clone(&self.network)
    }

    fn config(&self) -> &SyncConfig {
        &self.config
    }
}
