use crate::{SledKeyValueStorage, StorageError};
use anyhow::{anyhow, Context, Result};
use backsync_core::chain::ChainStore;
use backsync_core::{Block, BlockHeader, Hash};
use sled::{Db, IVec};
use std::path::Path;
use tracing::info;

const TREE_BLOCKS: &str = "blocks";
const TREE_BLOCK_HASHES: &str = "block_hashes";
const KEY_TIP_HEIGHT: &[u8] = b"tip_height";
const KEY_TIP_HASH: &[u8] = b"tip_hash";

/// Canonical chain store on sled. Blocks are keyed by big-endian number, with a
/// secondary hash -> number index.
#[derive(Clone)]
pub struct SledStore {
    db: Db,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path.as_ref())
            .with_context(|| format!("opening sled db at {}", path.as_ref().display()))?;
        info!("sled store opened");
        Ok(Self { db })
    }

    /// Named tree in the same database, for sync segment tables.
    pub fn kv_tree(&self, name: &str) -> Result<SledKeyValueStorage, StorageError> {
        Ok(SledKeyValueStorage::new(self.db.open_tree(name)?))
    }

    /// Remove every block and the tip markers.
    pub fn clear(&self) -> Result<()> {
        self.blocks()?.clear()?;
        self.block_hashes()?.clear()?;
        self.db.remove(KEY_TIP_HEIGHT)?;
        self.db.remove(KEY_TIP_HASH)?;
        self.db.flush()?;
        Ok(())
    }

    fn blocks(&self) -> Result<sled::Tree> {
        Ok(self.db.open_tree(TREE_BLOCKS)?)
    }

    fn block_hashes(&self) -> Result<sled::Tree> {
        Ok(self.db.open_tree(TREE_BLOCK_HASHES)?)
    }

    fn decode_block(bytes: &IVec) -> Result<Block> {
        bincode::deserialize(bytes).context("decoding stored block")
    }
}

fn ivec_to_u64(v: &IVec) -> Result<u64> {
    let arr: [u8; 8] = v
        .as_ref()
        .try_into()
        .map_err(|_| anyhow!("expected 8 bytes for block number, got {}", v.len()))?;
    Ok(u64::from_be_bytes(arr))
}

impl ChainStore for SledStore {
    fn put_block(&self, block: &Block) -> Result<()> {
        let number = block.header.number.to_be_bytes();
        let hash = block.hash();
        let bytes = bincode::serialize(block)?;
        self.blocks()?.insert(number, bytes)?;
        self.block_hashes()?.insert(hash, &number)?;

        // update tip
        self.db.insert(KEY_TIP_HEIGHT, &number)?;
        self.db.insert(KEY_TIP_HASH, &hash)?;

        self.db.flush()?;
        Ok(())
    }

    fn get_block(&self, number: u64) -> Result<Option<Block>> {
        self.blocks()?
            .get(number.to_be_bytes())?
            .map(|ivec| Self::decode_block(&ivec))
            .transpose()
    }

    fn get_block_by_hash(&self, hash: &Hash) -> Result<Option<Block>> {
        match self.block_hashes()?.get(hash)? {
            Some(number) => {
                let block = self.get_block(ivec_to_u64(&number)?)?;
                // A fork replaced this number; the index entry is stale.
                Ok(block.filter(|b| &b.hash() == hash))
            }
            None => Ok(None),
        }
    }

    fn get_block_header(&self, hash: &Hash) -> Result<Option<BlockHeader>> {
        Ok(self.get_block_by_hash(hash)?.map(|b| b.header))
    }

    fn get_block_hash_by_number(&self, number: u64) -> Result<Option<Hash>> {
        Ok(self.get_block(number)?.map(|b| b.hash()))
    }

    fn tip_height(&self) -> Result<u64> {
        self.db
            .get(KEY_TIP_HEIGHT)?
            .map(|v| ivec_to_u64(&v))
            .transpose()
            .map(|h| h.unwrap_or(0))
    }

    fn tip_hash(&self) -> Result<Option<Hash>> {
        self.db
            .get(KEY_TIP_HASH)?
            .map(|v| {
                Hash::try_from(v.as_ref())
                    .map_err(|_| anyhow!("expected 32 bytes for tip hash, got {}", v.len()))
            })
            .transpose()
    }

    fn close(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
