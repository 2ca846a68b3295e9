use crate::cache::CacheBlock;
use crate::error::{Error, Result};
use crate::layout::{fold_offset, plan};
use crate::meta::FileInfo;
use crate::store::{record_load, Backend};
use crate::utils::{now_ms, MAX_BLOCK_SIZE};
use std::cmp::min;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// live state of one file, always accessed under the lock of its
/// [`crate::cache::SharedEntry`]
#[derive(Debug)]
pub struct CacheEntry {
    pub info: FileInfo,
    cached_at: i64,
    /// sparse, loaded on demand
    blocks: BTreeMap<u64, CacheBlock>,
    /// set once the entry left the directory, holders must re-resolve
    evicted: bool,
}

impl CacheEntry {
    pub fn new(info: FileInfo) -> Self {
        Self {
            info,
            cached_at: now_ms(),
            blocks: BTreeMap::new(),
            evicted: false,
        }
    }

    pub fn cached_at(&self) -> i64 {
        self.cached_at
    }

    pub fn is_evicted(&self) -> bool {
        self.evicted
    }

    pub fn evict(&mut self) {
        self.evicted = true;
        self.blocks.clear();
    }

    pub fn block(&self, idx: u64) -> Option<&CacheBlock> {
        self.blocks.get(&idx)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// blocks worth persisting, in index order
    pub fn dirty_blocks(&self) -> Vec<(u64, &[u8])> {
        self.blocks
            .iter()
            .filter(|(_, b)| !b.is_empty())
            .map(|(i, b)| (*i, b.data()))
            .collect()
    }

    /// `pull` is false when the caller is about to overwrite the whole block
    fn load_block(&mut self, backend: &dyn Backend, idx: u64, pull: bool) -> Result<&mut CacheBlock> {
        match self.blocks.entry(idx) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let blk = if pull {
                    match backend.load_block(&self.info.container, &self.info.name, idx)? {
                        Some(data) => {
                            log::debug!(
                                "load block {} of {}/{} len {}",
                                idx,
                                self.info.container,
                                self.info.name,
                                data.len()
                            );
                            record_load(data.len());
                            CacheBlock::from_vec(data)?
                        }
                        None => CacheBlock::new(),
                    }
                } else {
                    CacheBlock::new()
                };
                Ok(e.insert(blk))
            }
        }
    }

    /// write `data` at `off`, zero filling any gap between the current size and
    /// `off` first, returns the number of bytes of `data` that were stored
    pub fn write_at(&mut self, backend: &dyn Backend, off: u64, data: &[u8]) -> Result<usize> {
        let off = fold_offset(off, &self.info.opts);
        let size = self.info.size;
        if off > size {
            self.zero_fill(backend, off)?;
        }
        let n = self.write_segments(backend, off, data)?;
        if n > 0 || self.info.size != size {
            self.info.touch();
        }
        Ok(n)
    }

    fn zero_fill(&mut self, backend: &dyn Backend, to: u64) -> Result<()> {
        let zeros = vec![0u8; min(to - self.info.size, MAX_BLOCK_SIZE) as usize];
        let mut cur = self.info.size;
        while cur < to {
            let n = min(to - cur, MAX_BLOCK_SIZE) as usize;
            if self.write_segments(backend, cur, &zeros[..n])? < n {
                // capacity reached
                break;
            }
            cur += n as u64;
        }
        Ok(())
    }

    fn write_segments(&mut self, backend: &dyn Backend, off: u64, data: &[u8]) -> Result<usize> {
        let segs = plan(off, data.len(), &self.info.opts);
        let mut nbytes = 0;
        for s in &segs {
            let whole = s.pos == 0 && s.len as u64 == MAX_BLOCK_SIZE;
            let blk = self.load_block(backend, s.block, !whole)?;
            blk.write(s.pos, &data[s.src..s.src + s.len])?;
            nbytes += s.len;
            if s.end() > self.info.size {
                self.info.size = s.end();
            }
        }
        Ok(nbytes)
    }

    /// fill `dst` from `off`, circular files continue at 0 once they are full
    pub fn read_at(&mut self, backend: &dyn Backend, off: u64, dst: &mut [u8]) -> Result<usize> {
        let opts = self.info.opts;
        let size = self.info.size;
        if !opts.circular && off > size {
            return Err(Error::PastEndOfFile { offset: off, size });
        }
        let off = fold_offset(off, &opts);
        let avail = if opts.circular && size >= opts.max_size && off < opts.max_size {
            size
        } else {
            size.saturating_sub(off)
        };
        let want = min(dst.len() as u64, avail) as usize;

        let mut nbytes = 0;
        for s in &plan(off, want, &opts) {
            let blk = self.load_block(backend, s.block, true)?;
            let n = blk.read(s.pos, &mut dst[s.src..s.src + s.len]);
            nbytes += n;
            if n < s.len {
                log::warn!(
                    "block {} of {}/{} is short, want {} got {}",
                    s.block,
                    self.info.container,
                    self.info.name,
                    s.len,
                    n
                );
                break;
            }
        }
        Ok(nbytes)
    }

    /// logical length readable from offset 0
    pub fn data_len(&self) -> u64 {
        if self.info.opts.circular {
            min(self.info.size, self.info.opts.max_size)
        } else {
            self.info.size
        }
    }
}

#[cfg(test)]
mod test {
    use super::CacheEntry;
    use crate::config::Options;
    use crate::meta::{FileInfo, FileMeta, FileOptions};
    use crate::store::SqliteStore;
    use crate::utils::MAX_BLOCK_SIZE;

    const B: u64 = MAX_BLOCK_SIZE;

    fn entry(opts: FileOptions) -> CacheEntry {
        CacheEntry::new(FileInfo::new("c", "f", FileMeta::new(), opts))
    }

    #[test]
    fn test_overwrite_and_extend() {
        let db = SqliteStore::open(&Options::in_memory()).unwrap();
        let mut e = entry(FileOptions::default());

        assert_eq!(e.write_at(&db, 0, b"TESTMESSAGE").unwrap(), 11);
        assert_eq!(e.write_at(&db, 11, b"TESTMESSAGE").unwrap(), 11);
        assert_eq!(e.write_at(&db, 0, b"BEST").unwrap(), 4);
        assert_eq!(e.write_at(&db, 11, b"BEST").unwrap(), 4);
        assert_eq!(e.info.size, 22);
        assert_eq!(e.block(0).unwrap().data(), b"BESTMESSAGEBESTMESSAGE");
    }

    #[test]
    fn test_left_pad_spans_blocks() {
        let db = SqliteStore::open(&Options::in_memory()).unwrap();
        let mut e = entry(FileOptions::default());

        assert_eq!(e.write_at(&db, 2 * B + 3, b"xyz").unwrap(), 3);
        assert_eq!(e.info.size, 2 * B + 6);
        assert_eq!(e.block(0).unwrap().len() as u64, B);
        assert_eq!(e.block(1).unwrap().len() as u64, B);
        assert_eq!(e.block(2).unwrap().data(), b"\0\0\0xyz");
    }

    #[test]
    fn test_left_pad_stops_at_cap() {
        let db = SqliteStore::open(&Options::in_memory()).unwrap();
        let mut e = entry(FileOptions::with_max_size(8));

        assert_eq!(e.write_at(&db, 20, b"abc").unwrap(), 0);
        assert_eq!(e.info.size, 8);
    }

    #[test]
    fn test_circular_read_across_seam() {
        let db = SqliteStore::open(&Options::in_memory()).unwrap();
        let mut e = entry(FileOptions::circular(8));

        assert_eq!(e.write_at(&db, 0, b"01234567").unwrap(), 8);
        assert_eq!(e.write_at(&db, 6, b"ab").unwrap(), 2);
        assert_eq!(e.info.size, 8);

        let mut dst = [0u8; 4];
        assert_eq!(e.read_at(&db, 6, &mut dst).unwrap(), 4);
        assert_eq!(&dst, b"ab01");

        // past capacity folds back
        assert_eq!(e.read_at(&db, 14, &mut dst).unwrap(), 4);
        assert_eq!(&dst, b"ab01");

        // the capacity itself is the end
        assert_eq!(e.read_at(&db, 8, &mut dst).unwrap(), 0);
    }

    #[test]
    fn test_circular_write_at_capacity() {
        let db = SqliteStore::open(&Options::in_memory()).unwrap();
        let mut e = entry(FileOptions::circular(8));

        assert_eq!(e.write_at(&db, 0, b"xyz").unwrap(), 3);
        // pads up to the capacity, then wraps
        assert_eq!(e.write_at(&db, 8, b"ab").unwrap(), 2);
        assert_eq!(e.info.size, 8);

        let mut dst = [0xffu8; 8];
        assert_eq!(e.read_at(&db, 0, &mut dst).unwrap(), 8);
        assert_eq!(&dst, b"abz\0\0\0\0\0");
    }

    #[test]
    fn test_touch_only_on_change() {
        let db = SqliteStore::open(&Options::in_memory()).unwrap();
        let mut e = entry(FileOptions::with_max_size(4));
        assert_eq!(e.write_at(&db, 0, b"TEST").unwrap(), 4);

        e.info.mod_ts = 0;
        assert_eq!(e.write_at(&db, 4, b"more").unwrap(), 0);
        assert_eq!(e.write_at(&db, 9, b"more").unwrap(), 0);
        assert_eq!(e.info.mod_ts, 0);

        assert_eq!(e.write_at(&db, 0, b"B").unwrap(), 1);
        assert!(e.info.mod_ts > 0);
    }

    #[test]
    fn test_read_past_end() {
        let db = SqliteStore::open(&Options::in_memory()).unwrap();
        let mut e = entry(FileOptions::default());
        e.write_at(&db, 0, b"abc").unwrap();

        let mut dst = [0u8; 4];
        assert_eq!(e.read_at(&db, 3, &mut dst).unwrap(), 0);
        assert!(e.read_at(&db, 4, &mut dst).is_err());
        assert_eq!(e.read_at(&db, 1, &mut dst).unwrap(), 2);
        assert_eq!(&dst[..2], b"bc");
    }

    #[test]
    fn test_dirty_blocks_and_evict() {
        let db = SqliteStore::open(&Options::in_memory()).unwrap();
        let mut e = entry(FileOptions::default());
        e.write_at(&db, B - 1, b"ab").unwrap();

        let dirty = e.dirty_blocks();
        assert_eq!(dirty.len(), 2);
        assert_eq!(dirty[0].1.len() as u64, B);
        assert_eq!(dirty[1], (1, &b"b"[..]));

        e.evict();
        assert!(e.is_evicted());
        assert_eq!(e.block_count(), 0);
    }
}
