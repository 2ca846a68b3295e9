mod block;
mod directory;
mod entry;

pub use block::CacheBlock;
pub use directory::{CacheDirectory, SharedEntry};
pub use entry::CacheEntry;
