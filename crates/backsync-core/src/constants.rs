pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const ZERO_HASH: [u8; HASH_SIZE] = [0u8; HASH_SIZE];
pub const GENESIS_NUMBER: u64 = 0;
