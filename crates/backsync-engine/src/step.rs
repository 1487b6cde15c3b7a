use crate::{retry, BackwardChain, SyncContext, SyncError};
use backsync_core::{hash_hex, BlockHeader, Hash};
use std::sync::Arc;
use tracing::debug;

/// Where a requested header came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderSource {
    /// The local canonical chain already has it: the segment has connected.
    Local,
    Network,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedHeader {
    pub header: BlockHeader,
    pub source: HeaderSource,
}

impl FetchedHeader {
    pub fn is_local(&self) -> bool {
        self.source == HeaderSource::Local
    }
}

/// Resolves one unresolved ancestor of a [`BackwardChain`] per call to
/// [`execute`](Self::execute). Callers must not run two steps against the same
/// chain concurrently.
pub struct BackwardSyncStep<C: SyncContext> {
    context: Arc<C>,
    backward_chain: Arc<BackwardChain>,
}

impl<C: SyncContext> BackwardSyncStep<C> {
    pub fn new(context: Arc<C>, backward_chain: Arc<BackwardChain>) -> Self {
        Self {
            context,
            backward_chain,
        }
    }

    /// Consume any run of ancestors a previous session already persisted below
    /// `first_ancestor` and return the first hash with no stored header.
    pub fn possible_restore_old_nodes(&self, first_ancestor: &BlockHeader) -> Result<Hash, SyncError> {
        let mut last_hash = first_ancestor.parent_hash;
        let mut restored = 0u64;
        while let Some(header) = self.backward_chain.header(&last_hash)? {
            let frontier_parent = self
                .backward_chain
                .first_ancestor_header()
                .map(|f| f.parent_hash);
            // Headers below a stale `first_ancestor` may already be in the segment.
            if frontier_parent == Some(last_hash) {
                self.backward_chain.prepend_stored_header(&header)?;
                restored += 1;
            }
            last_hash = header.parent_hash;
        }
        if restored > 0 {
            debug!(restored, next = %hash_hex(&last_hash), "restored persisted ancestors");
        }
        Ok(last_hash)
    }

    /// Resolve `hash` from the local chain if possible, otherwise from a peer
    /// under the configured retry ceiling.
    pub async fn request_headers(&self, hash: Hash) -> Result<FetchedHeader, SyncError> {
        let local = self
            .context
            .local_chain()
            .block_header(&hash)
            .map_err(SyncError::LocalChain)?;
        if let Some(header) = local {
            debug!(number = header.number, hash = %hash_hex(&hash), "header already in local chain");
            return Ok(FetchedHeader {
                header,
                source: HeaderSource::Local,
            });
        }

        let network = self.context.network();
        let header = retry::fetch_header(network.as_ref(), hash, self.context.config()).await?;
        debug!(number = header.number, hash = %hash_hex(&hash), "fetched header from peer");
        Ok(FetchedHeader {
            header,
            source: HeaderSource::Network,
        })
    }

    pub fn save_header(&self, header: &BlockHeader) -> Result<(), SyncError> {
        self.backward_chain.prepend_ancestors_header(header)
    }

    /// Advance the segment by one header.
    pub async fn execute(&self, first_ancestor: &BlockHeader) -> Result<FetchedHeader, SyncError> {
        let target = self.possible_restore_old_nodes(first_ancestor)?;
        let fetched = self.request_headers(target).await?;
        self.save_header(&fetched.header)?;
        Ok(fetched)
    }
}
