use crate::constants::REQUEST_TIMEOUT_SECS;
use async_trait::async_trait;
use backsync_core::{hash_hex, Block, BlockHeader, Hash};
use backsync_engine::{BlockFetcher, HeaderFetcher, PeerError};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// A remote node reached over its HTTP API.
pub struct HttpPeer {
    base: String,
    client: Client,
}

impl HttpPeer {
    pub fn new(base: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get(&self, path: String) -> Result<reqwest::Response, PeerError> {
        let url = format!("{}{path}", self.base);
        debug!(%url, "peer request");
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| PeerError::Transport(e.to_string()))
    }
}

#[async_trait]
impl HeaderFetcher for HttpPeer {
    async fn get_headers_by_hash(
        &self,
        hash: Hash,
        limit: u32,
    ) -> Result<Vec<BlockHeader>, PeerError> {
        let res = self
            .get(format!("/headers/{}?limit={limit}", hash_hex(&hash)))
            .await?;
        if !res.status().is_success() {
            return Err(PeerError::Status(res.status().as_u16()));
        }
        res.json().await.map_err(|e| PeerError::Decode(e.to_string()))
    }
}

#[async_trait]
impl BlockFetcher for HttpPeer {
    async fn get_block_by_hash(&self, hash: Hash) -> Result<Option<Block>, PeerError> {
        let res = self.get(format!("/blocks/{}", hash_hex(&hash))).await?;
        match res.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => res
                .json()
                .await
                .map(Some)
                .map_err(|e| PeerError::Decode(e.to_string())),
            status => Err(PeerError::Status(status.as_u16())),
        }
    }
}
