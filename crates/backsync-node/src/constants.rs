pub(crate) const MAX_HEADERS_PER_REQUEST: u32 = 1024;
pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 10;
pub(crate) const TREE_SYNC_HEADERS: &str = "backward_sync_headers";
pub(crate) const TREE_SYNC_BLOCKS: &str = "backward_sync_blocks";
pub(crate) const TREE_SYNC_CHAIN: &str = "backward_sync_chain";
