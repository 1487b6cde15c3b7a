use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: u32 = 25;
pub const DEFAULT_MAX_RETRIES: u32 = 4;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 250;

/// Tuning for peer requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Headers asked for per request. Only the first matching one is used.
    /// Values below 1 are treated as 1.
    pub batch_size: u32,
    /// Attempts per hash before giving up. Values below 1 are treated as 1.
    pub max_retries: u32,
    /// Pause between attempts.
    pub retry_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl SyncConfig {
    pub fn headers_per_request(&self) -> u32 {
        self.batch_size.max(1)
    }

    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
