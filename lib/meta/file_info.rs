use crate::error::{Error, Result};
use crate::utils::{now_ms, FileKey, UNBOUNDED_SIZE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// free form, json encoded attributes of a file
pub type FileMeta = serde_json::Map<String, Value>;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOptions {
    /// logical capacity in bytes
    pub max_size: u64,
    /// wrap to offset 0 at `max_size` instead of truncating
    pub circular: bool,
    /// append-only json record stream
    pub structured: bool,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            max_size: UNBOUNDED_SIZE,
            circular: false,
            structured: false,
        }
    }
}

impl FileOptions {
    pub fn with_max_size(max_size: u64) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }

    pub fn circular(max_size: u64) -> Self {
        Self {
            max_size,
            circular: true,
            structured: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_size > UNBOUNDED_SIZE {
            return Err(Error::InvalidOptions(format!("max_size {} overflows i64", self.max_size)));
        }
        if self.circular && self.max_size == 0 {
            return Err(Error::InvalidOptions("circular file must have a max_size".to_string()));
        }
        if self.circular && self.structured {
            return Err(Error::InvalidOptions("circular file can't be structured".to_string()));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub container: String,
    pub name: String,
    /// bytes written so far, saturates at `max_size` for circular files
    pub size: u64,
    pub created_ts: i64,
    pub mod_ts: i64,
    pub opts: FileOptions,
    pub meta: FileMeta,
}

impl FileInfo {
    pub fn new(container: &str, name: &str, meta: FileMeta, opts: FileOptions) -> Self {
        let now = now_ms();
        Self {
            container: container.to_string(),
            name: name.to_string(),
            size: 0,
            created_ts: now,
            mod_ts: now,
            opts,
            meta,
        }
    }

    pub fn key(&self) -> FileKey {
        FileKey::new(&self.container, &self.name)
    }

    pub fn touch(&mut self) {
        self.mod_ts = now_ms();
    }

    /// top level merge, a `null` value removes the key
    pub fn merge_meta(&mut self, meta: FileMeta) {
        for (k, v) in meta {
            if v.is_null() {
                self.meta.remove(&k);
            } else {
                self.meta.insert(k, v);
            }
        }
    }
}
