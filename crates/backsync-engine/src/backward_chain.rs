use crate::SyncError;
use backsync_core::{hash_hex, Block, BlockHeader, Hash};
use backsync_storage::{
    hash_key, BlockConvertor, HashConvertor, HeaderConvertor, InMemoryKeyValueStorage,
    KeyValueStorage, KeyValueStorageFacade,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

#[derive(Default)]
struct Anchors {
    /// Lowest header known in the segment.
    first_ancestor: Option<BlockHeader>,
    /// Highest trusted header; successor links end here.
    pivot: Option<BlockHeader>,
}

/// A hash-linked chain segment between a trusted tip and the frontier.
///
/// Headers, blocks and successor links (`ancestor -> child`) are persisted
/// through the three facades. The frontier and pivot live in memory and only
/// move after the corresponding write succeeded.
pub struct BackwardChain {
    headers: KeyValueStorageFacade<Hash, BlockHeader>,
    blocks: KeyValueStorageFacade<Hash, Block>,
    chain: KeyValueStorageFacade<Hash, Hash>,
    anchors: Mutex<Anchors>,
}

impl BackwardChain {
    pub fn new(
        headers: KeyValueStorageFacade<Hash, BlockHeader>,
        blocks: KeyValueStorageFacade<Hash, Block>,
        chain: KeyValueStorageFacade<Hash, Hash>,
    ) -> Self {
        Self {
            headers,
            blocks,
            chain,
            anchors: Mutex::new(Anchors::default()),
        }
    }

    /// Build the three facades over raw stores.
    pub fn with_storage(
        headers: Arc<dyn KeyValueStorage>,
        blocks: Arc<dyn KeyValueStorage>,
        chain: Arc<dyn KeyValueStorage>,
    ) -> Self {
        Self::new(
            KeyValueStorageFacade::new(hash_key, HeaderConvertor, headers),
            KeyValueStorageFacade::new(hash_key, BlockConvertor, blocks),
            KeyValueStorageFacade::new(hash_key, HashConvertor, chain),
        )
    }

    pub fn in_memory() -> Self {
        Self::with_storage(
            Arc::new(InMemoryKeyValueStorage::new()),
            Arc::new(InMemoryKeyValueStorage::new()),
            Arc::new(InMemoryKeyValueStorage::new()),
        )
    }

    /// New segment anchored at `trusted_block`.
    pub fn create(
        trusted_block: &Block,
        headers: KeyValueStorageFacade<Hash, BlockHeader>,
        blocks: KeyValueStorageFacade<Hash, Block>,
        chain: KeyValueStorageFacade<Hash, Hash>,
    ) -> Result<Self, SyncError> {
        let backward_chain = Self::new(headers, blocks, chain);
        backward_chain.append_trusted_block(trusted_block)?;
        Ok(backward_chain)
    }

    fn anchors(&self) -> MutexGuard<'_, Anchors> {
        self.anchors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Anchor the segment at `block`, or extend it forward when `block` is the
    /// child of the current pivot.
    pub fn append_trusted_block(&self, block: &Block) -> Result<(), SyncError> {
        let mut anchors = self.anchors();
        let header = &block.header;
        let hash = block.hash();
        match anchors.pivot.as_ref() {
            None => {
                self.headers.put(&hash, header)?;
                self.blocks.put(&hash, block)?;
                anchors.first_ancestor = Some(header.clone());
                anchors.pivot = Some(header.clone());
                debug!(number = header.number, hash = %hash_hex(&hash), "anchored backward chain");
            }
            Some(pivot) if header.parent_hash == pivot.hash() => {
                let pivot_hash = pivot.hash();
                self.headers.put(&hash, header)?;
                self.blocks.put(&hash, block)?;
                self.chain.put(&pivot_hash, &hash)?;
                anchors.pivot = Some(header.clone());
                debug!(number = header.number, hash = %hash_hex(&hash), "moved pivot forward");
            }
            Some(pivot) => {
                warn!(
                    number = header.number,
                    pivot = pivot.number,
                    "trusted block does not extend the pivot"
                );
                return Err(SyncError::Linkage {
                    expected: pivot.hash(),
                    actual: header.parent_hash,
                });
            }
        }
        Ok(())
    }

    /// Header at the frontier, `None` for an empty segment.
    pub fn first_ancestor_header(&self) -> Option<BlockHeader> {
        self.anchors().first_ancestor.clone()
    }

    pub fn pivot_header(&self) -> Option<BlockHeader> {
        self.anchors().pivot.clone()
    }

    pub fn trusted_block(&self) -> Result<Option<Block>, SyncError> {
        match self.pivot_header() {
            Some(pivot) => self.block(&pivot.hash()),
            None => Ok(None),
        }
    }

    /// Grow the segment backward by `header`, which must be the frontier's parent.
    pub fn prepend_ancestors_header(&self, header: &BlockHeader) -> Result<(), SyncError> {
        self.prepend(header, false)
    }

    /// Like [`Self::prepend_ancestors_header`] for a header already in the
    /// headers table.
    pub fn prepend_stored_header(&self, header: &BlockHeader) -> Result<(), SyncError> {
        self.prepend(header, true)
    }

    /// Requires an anchored segment; `append_trusted_block` seeds the pivot.
    fn prepend(&self, header: &BlockHeader, already_stored: bool) -> Result<(), SyncError> {
        let mut anchors = self.anchors();
        let hash = header.hash();
        let first = anchors.first_ancestor.as_ref().ok_or(SyncError::EmptyChain)?;
        if first.parent_hash != hash {
            warn!(
                number = header.number,
                frontier = first.number,
                "previous headers do not match new header"
            );
            return Err(SyncError::Linkage {
                expected: first.parent_hash,
                actual: hash,
            });
        }
        if first.number.checked_sub(1) != Some(header.number) {
            warn!(
                number = header.number,
                frontier = first.number,
                "ancestor height does not precede the frontier"
            );
            return Err(SyncError::HeightGap {
                frontier: first.number,
                actual: header.number,
            });
        }
        let first_hash = first.hash();
        if !already_stored {
            self.headers.put(&hash, header)?;
        }
        self.chain.put(&hash, &first_hash)?;
        anchors.first_ancestor = Some(header.clone());
        debug!(number = header.number, hash = %hash_hex(&hash), "prepended ancestor");
        Ok(())
    }

    /// Stored header for `hash`. A header that does not hash to its key is an
    /// integrity error.
    pub fn header(&self, hash: &Hash) -> Result<Option<BlockHeader>, SyncError> {
        match self.headers.get(hash)? {
            Some(header) => {
                let actual = header.hash();
                if &actual != hash {
                    return Err(SyncError::HashMismatch { key: *hash, actual });
                }
                Ok(Some(header))
            }
            None => Ok(None),
        }
    }

    pub fn block(&self, hash: &Hash) -> Result<Option<Block>, SyncError> {
        match self.blocks.get(hash)? {
            Some(block) => {
                let actual = block.hash();
                if &actual != hash {
                    return Err(SyncError::HashMismatch { key: *hash, actual });
                }
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    pub fn store_block(&self, block: &Block) -> Result<(), SyncError> {
        Ok(self.blocks.put(&block.hash(), block)?)
    }

    /// Child of `hash` within the segment.
    pub fn successor(&self, hash: &Hash) -> Result<Option<Hash>, SyncError> {
        Ok(self.chain.get(hash)?)
    }

    /// Drop all persisted segment state.
    pub fn clear(&self) -> Result<(), SyncError> {
        let mut anchors = self.anchors();
        self.headers.clear()?;
        self.blocks.clear()?;
        self.chain.clear()?;
        *anchors = Anchors::default();
        Ok(())
    }
}
