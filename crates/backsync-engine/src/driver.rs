use crate::{retry, BackwardChain, BackwardSyncStep, BlockImporter, SyncContext, SyncError};
use backsync_core::constants::GENESIS_NUMBER;
use backsync_core::{hash_hex, BlockHeader};
use std::sync::Arc;
use tracing::{debug, info};

/// Drives a [`BackwardChain`] from its trusted tip down to local history and
/// then forward into canonical storage.
pub struct BackwardSyncDriver<C: SyncContext> {
    context: Arc<C>,
    backward_chain: Arc<BackwardChain>,
    step: BackwardSyncStep<C>,
}

impl<C: SyncContext> BackwardSyncDriver<C> {
    pub fn new(context: Arc<C>, backward_chain: Arc<BackwardChain>) -> Self {
        let step = BackwardSyncStep::new(Arc::clone(&context), Arc::clone(&backward_chain));
        Self {
            context,
            backward_chain,
            step,
        }
    }

    /// Step until a header is resolved from the local chain and return it.
    pub async fn sync_to_local(&self) -> Result<BlockHeader, SyncError> {
        let mut steps = 0u64;
        loop {
            let frontier = self
                .backward_chain
                .first_ancestor_header()
                .ok_or(SyncError::EmptyChain)?;
            if frontier.number == GENESIS_NUMBER {
                let hash = frontier.hash();
                let local = self
                    .context
                    .local_chain()
                    .block_header(&hash)
                    .map_err(SyncError::LocalChain)?;
                return match local {
                    Some(header) => {
                        info!(steps, hash = %hash_hex(&hash), "backward chain anchored at shared genesis");
                        Ok(header)
                    }
                    None => Err(SyncError::GenesisMismatch(hash)),
                };
            }
            let fetched = self.step.execute(&frontier).await?;
            steps += 1;
            if fetched.is_local() {
                info!(
                    steps,
                    number = fetched.header.number,
                    hash = %hash_hex(&fetched.header.hash()),
                    "backward chain connected to local chain"
                );
                return Ok(fetched.header);
            }
            if steps % 100 == 0 {
                debug!(steps, frontier = fetched.header.number, "backward sync progress");
            }
        }
    }

    /// Import every block above the connection point up to the trusted tip, in
    /// ascending order, then clear the segment. Returns the number of blocks
    /// imported. Bodies missing from the segment are fetched from a peer.
    pub async fn stitch<I>(&self, importer: &I) -> Result<u64, SyncError>
    where
        I: BlockImporter + ?Sized,
    {
        let connection = self
            .backward_chain
            .first_ancestor_header()
            .ok_or(SyncError::EmptyChain)?;
        let pivot = self
            .backward_chain
            .pivot_header()
            .ok_or(SyncError::EmptyChain)?;
        let local = self.context.local_chain();
        let mut current = connection.hash();
        if local
            .block_header(&current)
            .map_err(SyncError::LocalChain)?
            .is_none()
        {
            return Err(SyncError::NotConnected(current));
        }

        let pivot_hash = pivot.hash();
        let mut imported = 0u64;
        while current != pivot_hash {
            let next = self
                .backward_chain
                .successor(&current)?
                .ok_or(SyncError::MissingSuccessor(current))?;
            let block = match self.backward_chain.block(&next)? {
                Some(block) => block,
                None => {
                    let network = self.context.network();
                    let block = retry::fetch_block(network.as_ref(), next, self.context.config()).await?;
                    self.backward_chain.store_block(&block)?;
                    block
                }
            };
            let known = local
                .block_header(&next)
                .map_err(SyncError::LocalChain)?
                .is_some();
            if !known {
                importer.import_block(&block).map_err(SyncError::Import)?;
                imported += 1;
            }
            current = next;
        }

        self.backward_chain.clear()?;
        info!(imported, tip = pivot.number, "stitched backward chain into local chain");
        Ok(imported)
    }

    pub async fn run<I>(&self, importer: &I) -> Result<u64, SyncError>
    where
        I: BlockImporter + ?Sized,
    {
        self.sync_to_local().await?;
        self.stitch(importer).await
    }
}
