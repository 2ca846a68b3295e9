use crate::cache::{CacheDirectory, CacheEntry, SharedEntry};
use crate::config::Options;
use crate::error::{Error, Result};
use crate::fs::FlushStats;
use crate::meta::{FileInfo, FileMeta, FileOptions};
use crate::store::{record_flush, record_write, snapshot, Backend, SqliteStore, StatsSnapshot};
use crate::utils::FileKey;
use parking_lot::MutexGuard;
use std::sync::Arc;
use std::time::Instant;

/// Write-back cached file store.
///
/// Files live in the cache from their first touch until the next
/// [`BlockStore::flush`], the durable store only sees them at flush time.
/// Every operation on a file runs under the lock of its cache entry.
pub struct BlockStore {
    backend: Arc<dyn Backend>,
    dir: CacheDirectory,
}

impl BlockStore {
    pub fn open(opt: Options) -> Result<Self> {
        let opt = opt.validate()?;
        let db = SqliteStore::open(&opt)?;
        Ok(Self::with_backend(Arc::new(db)))
    }

    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            dir: CacheDirectory::new(),
        }
    }

    /// run `f` on the live entry of a file, loading it on first touch
    fn with_entry<R>(
        &self,
        container: &str,
        name: &str,
        f: impl FnOnce(&mut CacheEntry, &dyn Backend) -> Result<R>,
    ) -> Result<R> {
        let key = FileKey::new(container, name);
        loop {
            let shared = self.dir.resolve(&key, self.backend.as_ref())?;
            let mut st = shared.lock();
            if st.is_evicted() {
                // flushed or deleted between resolve and lock
                log::debug!("entry {} went stale, resolve again", key);
                continue;
            }
            let r = f(&mut *st, self.backend.as_ref());
            if let Err(Error::Invariant(msg)) = &r {
                log::error!("file {} {}", key, msg);
            }
            return r;
        }
    }

    pub fn create_file(&self, container: &str, name: &str, meta: FileMeta, opts: FileOptions) -> Result<()> {
        opts.validate()?;
        let key = FileKey::new(container, name);
        let resident = self.dir.get(&key);
        let guard = resident.as_ref().map(|e| e.lock());
        let info = FileInfo::new(container, name, meta, opts);
        self.backend.insert_file(&info)?;
        // the row did not exist, so a resident entry is a leftover of a delete
        if let Some(mut st) = guard {
            st.evict();
            log::warn!("create file {} displaced a stale entry", key);
        }
        self.dir.replace(key, CacheEntry::new(info));
        log::info!(
            "create file {}/{} max_size {} circular {}",
            container,
            name,
            opts.max_size,
            opts.circular
        );
        Ok(())
    }

    /// create a file and fill it with `data`
    pub fn write_file(
        &self,
        container: &str,
        name: &str,
        meta: FileMeta,
        opts: FileOptions,
        data: &[u8],
    ) -> Result<usize> {
        self.create_file(container, name, meta, opts)?;
        self.append(container, name, data)
    }

    /// write at the current end of the file, size is read under the same lock
    pub fn append(&self, container: &str, name: &str, data: &[u8]) -> Result<usize> {
        let n = self.with_entry(container, name, |e, backend| {
            let off = e.info.size;
            e.write_at(backend, off, data)
        })?;
        record_write(n);
        Ok(n)
    }

    /// returns how many bytes of `data` were stored, fewer than `data.len()`
    /// means the capacity of a regular file was reached
    pub fn write_at(&self, container: &str, name: &str, off: u64, data: &[u8]) -> Result<usize> {
        let n = self.with_entry(container, name, |e, backend| e.write_at(backend, off, data))?;
        record_write(n);
        Ok(n)
    }

    pub fn read_at(&self, container: &str, name: &str, off: u64, dst: &mut [u8]) -> Result<usize> {
        self.with_entry(container, name, |e, backend| e.read_at(backend, off, dst))
    }

    /// metadata and whole content of a file as of one instant
    pub fn read_file(&self, container: &str, name: &str) -> Result<(FileInfo, Vec<u8>)> {
        self.with_entry(container, name, |e, backend| {
            let mut buf = vec![0u8; e.data_len() as usize];
            let n = e.read_at(backend, 0, &mut buf)?;
            buf.truncate(n);
            Ok((e.info.clone(), buf))
        })
    }

    /// a copy, changing it has no effect on the file
    pub fn stat(&self, container: &str, name: &str) -> Result<FileInfo> {
        self.with_entry(container, name, |e, _| Ok(e.info.clone()))
    }

    pub fn write_meta(&self, container: &str, name: &str, meta: FileMeta) -> Result<()> {
        self.with_entry(container, name, |e, _| {
            e.info.meta = meta;
            e.info.touch();
            Ok(())
        })
    }

    /// `null` values remove their key
    pub fn merge_meta(&self, container: &str, name: &str, meta: FileMeta) -> Result<()> {
        self.with_entry(container, name, |e, _| {
            e.info.merge_meta(meta);
            e.info.touch();
            Ok(())
        })
    }

    pub fn delete_file(&self, container: &str, name: &str) -> Result<()> {
        let key = FileKey::new(container, name);
        let found = match self.dir.get(&key) {
            Some(shared) => {
                let mut st = shared.lock();
                let found = self.backend.delete_file(container, name)?;
                st.evict();
                self.dir.remove_if_same(&key, &shared);
                found
            }
            None => self.backend.delete_file(container, name)?,
        };
        if !found {
            return Err(Error::not_found(container, name));
        }
        log::info!("delete file {}", key);
        Ok(())
    }

    /// drop every file of `container`, returns how many the store held
    pub fn delete_container(&self, container: &str) -> Result<usize> {
        let mut keys = self.dir.keys_in(container);
        // fixed order, concurrent container deletes must not deadlock
        keys.sort();
        let shared: Vec<(FileKey, SharedEntry)> =
            keys.into_iter().filter_map(|k| self.dir.get(&k).map(|e| (k, e))).collect();
        let mut guards: Vec<MutexGuard<'_, CacheEntry>> = shared.iter().map(|(_, e)| e.lock()).collect();

        let n = self.backend.delete_container(container)?;
        for g in guards.iter_mut() {
            g.evict();
        }
        for (k, e) in &shared {
            self.dir.remove_if_same(k, e);
        }
        drop(guards);

        // entries loaded after the snapshot above
        for k in self.dir.keys_in(container) {
            let Some(e) = self.dir.get(&k) else {
                continue;
            };
            let mut st = e.lock();
            if !st.is_evicted() && self.backend.get_file(&k.container, &k.name)?.is_none() {
                st.evict();
                self.dir.remove_if_same(&k, &e);
            }
        }
        log::info!("delete container {} files {} cached {}", container, n, shared.len());
        Ok(n)
    }

    /// files of `container` as last flushed, ordered by name
    pub fn list_files(&self, container: &str) -> Result<Vec<FileInfo>> {
        self.backend.list_files(container)
    }

    pub fn list_all_files(&self) -> Result<Vec<FileInfo>> {
        self.backend.list_all_files()
    }

    pub fn all_container_ids(&self) -> Result<Vec<String>> {
        self.backend.container_ids()
    }

    /// Persist and drop every cached entry.
    ///
    /// Each file is written in its own transaction and evicted right after it
    /// commits. On error the walk stops, files not reached yet stay cached and
    /// a later flush retries them.
    pub fn flush(&self) -> Result<FlushStats> {
        let start = Instant::now();
        let mut stats = FlushStats::default();
        let mut keys = self.dir.keys();
        keys.sort();

        for key in keys {
            let Some(shared) = self.dir.get(&key) else {
                continue;
            };
            let mut st = shared.lock();
            if st.is_evicted() {
                continue;
            }
            stats.entries += 1;
            let r = {
                let dirty = st.dirty_blocks();
                let bytes: u64 = dirty.iter().map(|(_, b)| b.len() as u64).sum();
                self.backend.persist(&st.info, &dirty).map(|ok| (ok, dirty.len(), bytes))
            };
            match r {
                Ok((true, blocks, bytes)) => {
                    stats.committed += 1;
                    stats.blocks += blocks;
                    stats.bytes += bytes;
                }
                Ok((false, _, _)) => log::warn!("file {} deleted before flush, dropped", key),
                Err(e) => {
                    log::error!("flush {} fail, error {}", key, e);
                    record_flush(stats.bytes, start.elapsed().as_nanos() as u64, false);
                    return Err(e);
                }
            }
            st.evict();
            self.dir.remove_if_same(&key, &shared);
        }

        let elapsed = start.elapsed();
        record_flush(stats.bytes, elapsed.as_nanos() as u64, true);
        if stats.entries > 0 {
            log::info!(
                "flush entries {} committed {} blocks {} bytes {} in {:?}",
                stats.entries,
                stats.committed,
                stats.blocks,
                stats.bytes,
                elapsed
            );
        }
        Ok(stats)
    }

    /// number of resident cache entries
    pub fn cached_len(&self) -> usize {
        self.dir.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        snapshot()
    }
}
