pub mod constants;

use constants::{GENESIS_NUMBER, HASH_HEX_SIZE, HASH_SIZE, ZERO_HASH};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub type Hash = [u8; HASH_SIZE];

/// Lowercase hex rendering used in logs, URLs and CLI flags.
pub fn hash_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

#[derive(Debug, thiserror::Error)]
pub enum HashParseError {
    #[error("expected 64 hex characters, got {0}")]
    Length(usize),
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Parse a 64-character hex string, with or without a `0x` prefix.
pub fn parse_hash(s: &str) -> Result<Hash, HashParseError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.len() != HASH_HEX_SIZE {
        return Err(HashParseError::Length(s.len()));
    }
    let mut out = ZERO_HASH;
    hex::decode_to_slice(s, &mut out)?;
    Ok(out)
}

fn sha256(bytes: &[u8]) -> Hash {
    let digest = Sha256::digest(bytes);
    let mut out = ZERO_HASH;
    out.copy_from_slice(&digest[..]);
    out
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub number: u64,
    pub parent_hash: Hash,
    pub merkle_root: Hash,
    pub timestamp: u64,
    #[serde(default)]
    pub extra_data: Vec<u8>,
}

impl BlockHeader {
    pub fn new(number: u64, parent_hash: Hash, merkle_root: Hash, timestamp: u64) -> Self {
        Self {
            number,
            parent_hash,
            merkle_root,
            timestamp,
            extra_data: Vec::new(),
        }
    }

    pub fn hash_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + 32 + 32 + 8 + 8 + self.extra_data.len());
        bytes.extend_from_slice(&self.number.to_le_bytes());
        bytes.extend_from_slice(&self.parent_hash);
        bytes.extend_from_slice(&self.merkle_root);
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes.extend_from_slice(&(self.extra_data.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&self.extra_data);
        bytes
    }

    /// Content hash of the header. Blocks are addressed by this value everywhere.
    pub fn hash(&self) -> Hash {
        sha256(&self.hash_bytes())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub txs: Vec<Transaction>,
}

impl Block {
    /// Build a block whose merkle root commits to `txs`.
    pub fn new(
        number: u64,
        parent_hash: Hash,
        txs: Vec<Transaction>,
        timestamp: u64,
        extra_data: Vec<u8>,
    ) -> Self {
        let mut header = BlockHeader::new(number, parent_hash, merkle_root(&txs), timestamp);
        header.extra_data = extra_data;
        Self { header, txs }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }
}

pub fn merkle_root(txs: &[Transaction]) -> Hash {
    if txs.is_empty() {
        return ZERO_HASH;
    }
    let mut level: Vec<Hash> = txs
        .iter()
        .map(|t| {
            // Serializing a plain struct of strings and integers cannot fail.
            let encoded = serde_json::to_vec(t).unwrap_or_default();
            sha256(&encoded)
        })
        .collect();

    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            let (a, b) = if pair.len() == 2 {
                (pair[0], pair[1])
            } else {
                (pair[0], pair[0])
            };
            let mut hasher = Sha256::new();
            hasher.update(a);
            hasher.update(b);
            let digest = hasher.finalize();
            let mut out = ZERO_HASH;
            out.copy_from_slice(&digest[..]);
            next.push(out);
        }
        level = next;
    }
    level[0]
}

pub mod chain {
    use super::*;
    use anyhow::Result;
    use std::sync::Arc;
    use tracing::debug;

    /// Trait the storage backends implement for the canonical chain.
    /// This lives in `backsync-core` to avoid a circular dependency.
    pub trait ChainStore: Send + Sync {
        fn put_block(&self, block: &Block) -> Result<()>;
        fn get_block(&self, number: u64) -> Result<Option<Block>>;
        fn get_block_by_hash(&self, hash: &Hash) -> Result<Option<Block>>;
        fn get_block_header(&self, hash: &Hash) -> Result<Option<BlockHeader>>;
        fn get_block_hash_by_number(&self, number: u64) -> Result<Option<Hash>>;
        fn tip_height(&self) -> Result<u64>;
        fn tip_hash(&self) -> Result<Option<Hash>>;
        fn close(&self) -> Result<()>;
    }

    #[derive(Debug, thiserror::Error)]
    pub enum ChainError {
        #[error("block {number} does not extend tip {tip}: parent {parent}")]
        NotOnTip {
            number: u64,
            tip: String,
            parent: String,
        },
        #[error("expected block number {expected}, got {actual}")]
        UnexpectedNumber { expected: u64, actual: u64 },
    }

    /// Canonical chain façade that delegates persistence to a `ChainStore`.
    #[derive(Clone)]
    pub struct Chain<S: ChainStore> {
        store: Arc<S>,
    }

    impl<S: ChainStore> Chain<S> {
        pub fn new(store: Arc<S>) -> Self {
            Self { store }
        }

        pub fn store(&self) -> &Arc<S> {
            &self.store
        }

        /// Ensure a genesis block exists. Idempotent.
        pub fn ensure_genesis(&self) -> Result<()> {
            let height = self.store.tip_height()?;
            // Height 0 can mean "empty" or "genesis at number 0". Check presence of block 0.
            if height == GENESIS_NUMBER && self.store.get_block(GENESIS_NUMBER)?.is_none() {
                let genesis = genesis_block();
                self.store.put_block(&genesis)?;
            }
            Ok(())
        }

        /// Return (height, tip_hash). Height is 0 for empty or at genesis.
        pub fn tip(&self) -> Result<(u64, Option<Hash>)> {
            Ok((self.store.tip_height()?, self.store.tip_hash()?))
        }

        /// Append `block` on top of the current tip.
        pub fn append_block(&self, block: &Block) -> Result<()> {
            let (height, tip) = self.tip()?;
            let tip = tip.unwrap_or(ZERO_HASH);
            if block.header.parent_hash != tip {
                return Err(ChainError::NotOnTip {
                    number: block.number(),
                    tip: hash_hex(&tip),
                    parent: hash_hex(&block.header.parent_hash),
                }
                .into());
            }
            if block.number() != height + 1 {
                return Err(ChainError::UnexpectedNumber {
                    expected: height + 1,
                    actual: block.number(),
                }
                .into());
            }
            self.store.put_block(block)?;
            debug!(number = block.number(), hash = %hash_hex(&block.hash()), "appended block");
            Ok(())
        }

        /// Up to `limit` headers starting at `hash` and walking toward genesis.
        /// Empty when `hash` is unknown.
        pub fn headers_descending(&self, hash: &Hash, limit: usize) -> Result<Vec<BlockHeader>> {
            let mut headers = Vec::with_capacity(limit.min(1024));
            let mut next = self.store.get_block_header(hash)?;
            while let Some(header) = next {
                if headers.len() >= limit {
                    break;
                }
                next = if header.number == GENESIS_NUMBER {
                    None
                } else {
                    self.store.get_block_header(&header.parent_hash)?
                };
                headers.push(header);
            }
            Ok(headers)
        }
    }

    /// A zero-transaction genesis block with zeroed parent hash and merkle root.
    pub fn genesis_block() -> Block {
        Block {
            header: BlockHeader::new(GENESIS_NUMBER, ZERO_HASH, ZERO_HASH, 0),
            txs: vec![],
        }
    }
}
