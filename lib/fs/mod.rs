mod blockstore;
mod flusher;

pub use blockstore::BlockStore;
pub use flusher::Flusher;

/// outcome of one [`BlockStore::flush`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushStats {
    /// entries visited
    pub entries: usize,
    /// entries whose transaction committed, the rest were deleted meanwhile
    pub committed: usize,
    pub blocks: usize,
    pub bytes: u64,
}
