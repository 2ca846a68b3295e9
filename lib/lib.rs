pub mod cache;
pub mod config;
pub mod error;
pub mod fs;
pub mod layout;
pub mod logger;
pub mod meta;
pub mod store;
pub mod utils;

pub use config::Options;
pub use error::{Error, Result};
pub use fs::{BlockStore, FlushStats, Flusher};
pub use meta::{FileInfo, FileMeta, FileOptions};
pub use utils::MAX_BLOCK_SIZE;
