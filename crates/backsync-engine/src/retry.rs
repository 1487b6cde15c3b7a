//! Bounded retry for peer requests.
//!
//! An attempt counts as failed when the peer errors, returns nothing, or
//! returns data that does not hash to the requested value. After
//! [`SyncConfig::attempts`] failures the request ends with
//! [`SyncError::MaxRetriesReached`].

use crate::{BlockFetcher, HeaderFetcher, PeerError, SyncConfig, SyncError};
use backsync_core::{hash_hex, Block, BlockHeader, Hash};
use std::future::Future;
use tracing::{debug, warn};

async fn with_retries<T, F, Fut>(
    what: &'static str,
    hash: Hash,
    config: &SyncConfig,
    mut attempt_once: F,
) -> Result<T, SyncError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, PeerError>>,
{
    let attempts = config.attempts();
    let delay = config.retry_delay();
    for attempt in 1..=attempts {
        match attempt_once().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {
                debug!(what, hash = %hash_hex(&hash), attempt, attempts, "peer had no matching data");
            }
            Err(e) => {
                warn!(what, hash = %hash_hex(&hash), attempt, attempts, error = %e, "peer request failed");
            }
        }
        if attempt < attempts && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    Err(SyncError::MaxRetriesReached { hash, attempts })
}

/// Fetch the header whose content hash is `hash`. Extra headers in a batch
/// response are discarded.
pub async fn fetch_header<F>(
    fetcher: &F,
    hash: Hash,
    config: &SyncConfig,
) -> Result<BlockHeader, SyncError>
where
    F: HeaderFetcher + ?Sized,
{
    with_retries("header", hash, config, || async move {
        let headers = fetcher.get_headers_by_hash(hash, config.headers_per_request()).await?;
        Ok(headers.into_iter().find(|h| h.hash() == hash))
    })
    .await
}

pub async fn fetch_block<F>(fetcher: &F, hash: Hash, config: &SyncConfig) -> Result<Block, SyncError>
where
    F: BlockFetcher + ?Sized,
{
    with_retries("block", hash, config, || async move {
        let block = fetcher.get_block_by_hash(hash).await?;
        Ok(block.filter(|b| b.hash() == hash))
    })
    .await
}
