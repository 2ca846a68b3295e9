mod file_info;

pub use file_info::{FileInfo, FileMeta, FileOptions};
