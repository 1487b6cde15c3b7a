//! Backward chain reconstruction.
//!
//! When a trusted block arrives whose ancestry is not in the local canonical
//! chain, the engine walks backward from it one parent hash at a time until it
//! reaches a header the local chain already knows, then replays the segment
//! forward into canonical storage.
//!
//! ```text
//! trusted tip ──► BackwardChain (headers / blocks / successor links)
//!                    ▲            │
//!                    │ prepend    │ frontier.parent_hash
//!                    │            ▼
//!              BackwardSyncStep::execute
//!                    │
//!                    ├─► restore headers persisted by an earlier run
//!                    ├─► LocalChain lookup        (connected: stop)
//!                    └─► HeaderFetcher, bounded retries
//! ```
//!
//! [`BackwardSyncDriver`] owns the loop: it steps until a header comes from the
//! local chain, then stitches the segment forward through a [`BlockImporter`].

mod backward_chain;
mod config;
mod context;
mod driver;
mod error;
mod retry;
mod step;

pub use backward_chain::BackwardChain;
pub use config::SyncConfig;
pub use context::{
    BackwardSyncContext, BlockFetcher, BlockImporter, HeaderFetcher, LocalChain, PeerNetwork,
    SyncContext,
};
pub use driver::BackwardSyncDriver;
pub use error::{PeerError, SyncError};
pub use retry::{fetch_block, fetch_header};
pub use step::{BackwardSyncStep, FetchedHeader, HeaderSource};
