//! Block arithmetic.
//!
//! A file is a sequence of `MAX_BLOCK_SIZE` blocks, block `i` covers
//! `[i * B, (i + 1) * B)`. Independently of the block boundary every file has a
//! logical capacity `max_size`: a write reaching it either stops (regular
//! file) or continues at offset 0 (circular file).

use crate::meta::FileOptions;
use crate::utils::MAX_BLOCK_SIZE;
use std::cmp::min;

/// one contiguous piece of an I/O that stays inside a single block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// block index
    pub block: u64,
    /// offset inside the block
    pub pos: usize,
    /// offset inside the caller's buffer
    pub src: usize,
    pub len: usize,
}

impl Segment {
    /// global file offset of the first byte
    pub fn file_off(&self) -> u64 {
        self.block * MAX_BLOCK_SIZE + self.pos as u64
    }

    pub fn end(&self) -> u64 {
        self.file_off() + self.len as u64
    }
}

pub const fn block_index(off: u64) -> u64 {
    off / MAX_BLOCK_SIZE
}

pub const fn block_offset(off: u64) -> u64 {
    off % MAX_BLOCK_SIZE
}

/// number of blocks an I/O of `len` bytes at `off` touches, ignoring `max_size`
pub const fn blocks_touched(off: u64, len: u64) -> u64 {
    if len == 0 {
        return 0;
    }
    block_index(off.saturating_add(len - 1)) - block_index(off) + 1
}

/// how many bytes block `idx` may hold: the block cap or what is left of the
/// file capacity, whichever is smaller
pub fn block_budget(idx: u64, max_size: u64) -> u64 {
    let start = idx.saturating_mul(MAX_BLOCK_SIZE);
    min(MAX_BLOCK_SIZE, max_size.saturating_sub(start))
}

/// map an offset past the capacity of a circular file back into it, an
/// offset equal to the capacity is left for the planner to wrap
pub fn fold_offset(off: u64, opts: &FileOptions) -> u64 {
    if opts.circular && opts.max_size > 0 && off > opts.max_size {
        off % opts.max_size
    } else {
        off
    }
}

/// split `len` bytes at `off` into per block segments
///
/// Regular files stop at `max_size`, the segments then cover fewer than `len`
/// bytes. Circular files restart at 0 each time they reach `max_size`.
pub fn plan(off: u64, len: usize, opts: &FileOptions) -> Vec<Segment> {
    let max = opts.max_size;
    let mut off = fold_offset(off, opts);
    let room = if opts.circular {
        len as u64
    } else {
        min(len as u64, max.saturating_sub(off))
    };
    let mut segs = Vec::with_capacity(blocks_touched(off, room) as usize);
    let mut src = 0usize;

    while src < len {
        if off >= max {
            if !opts.circular || max == 0 {
                break;
            }
            off = 0;
        }
        let block = block_index(off);
        let pos = block_offset(off);
        let budget = block_budget(block, max);
        let n = min((len - src) as u64, budget - pos) as usize;
        segs.push(Segment {
            block,
            pos: pos as usize,
            src,
            len: n,
        });
        src += n;
        off += n as u64;
    }
    segs
}

/// total bytes covered by `segs`
pub fn planned_len(segs: &[Segment]) -> usize {
    segs.iter().map(|s| s.len).sum()
}

#[cfg(test)]
mod test {
    use super::*;

    const B: u64 = MAX_BLOCK_SIZE;

    #[test]
    fn test_blocks_touched() {
        assert_eq!(blocks_touched(0, 0), 0);
        assert_eq!(blocks_touched(0, 1), 1);
        assert_eq!(blocks_touched(0, B), 1);
        assert_eq!(blocks_touched(0, B + 1), 2);
        assert_eq!(blocks_touched(B - 4, 11), 2);
        assert_eq!(blocks_touched(10, B + 10), 2);
        assert_eq!(blocks_touched(10, 2 * B), 3);
    }

    #[test]
    fn test_block_budget() {
        assert_eq!(block_budget(0, 4), 4);
        assert_eq!(block_budget(0, 3 * B), B);
        assert_eq!(block_budget(1, B + 7), 7);
        assert_eq!(block_budget(2, B + 7), 0);
        assert_eq!(block_budget(u64::MAX, u64::MAX), 0);
    }

    #[test]
    fn test_fold() {
        let c = FileOptions::circular(100);
        assert_eq!(fold_offset(99, &c), 99);
        assert_eq!(fold_offset(100, &c), 100);
        assert_eq!(fold_offset(200, &c), 0);
        assert_eq!(fold_offset(250, &c), 50);
        let r = FileOptions::with_max_size(100);
        assert_eq!(fold_offset(250, &r), 250);
    }

    #[test]
    fn test_plan_truncate() {
        let segs = plan(0, 11, &FileOptions::with_max_size(4));
        assert_eq!(segs.len(), 1);
        assert_eq!(planned_len(&segs), 4);

        assert!(plan(8, 11, &FileOptions::with_max_size(4)).is_empty());
    }

    #[test]
    fn test_plan_huge_offset() {
        assert_eq!(blocks_touched(u64::MAX - 2, 11), 1);
        assert!(plan(u64::MAX - 2, 11, &FileOptions::with_max_size(4)).is_empty());
        assert!(plan(u64::MAX - 2, 11, &FileOptions::default()).is_empty());

        let segs = plan(u64::MAX - 2, 3, &FileOptions::circular(4));
        assert_eq!(planned_len(&segs), 3);
        assert_eq!(segs[0].file_off(), (u64::MAX - 2) % 4);
    }

    #[test]
    fn test_plan_wrap_at_capacity() {
        // an offset equal to the capacity starts over at 0
        let segs = plan(8, 2, &FileOptions::circular(8));
        assert_eq!(segs, vec![Segment { block: 0, pos: 0, src: 0, len: 2 }]);
    }

    #[test]
    fn test_plan_cross_block() {
        let segs = plan(B - 4, 11, &FileOptions::default());
        assert_eq!(
            segs,
            vec![
                Segment { block: 0, pos: (B - 4) as usize, src: 0, len: 4 },
                Segment { block: 1, pos: 0, src: 4, len: 7 },
            ]
        );
        assert_eq!(segs[1].file_off(), B);
        assert_eq!(segs[1].end(), B + 7);
    }

    #[test]
    fn test_plan_wrap() {
        let segs = plan(2 * B - 4, 11, &FileOptions::circular(2 * B));
        assert_eq!(
            segs,
            vec![
                Segment { block: 1, pos: (B - 4) as usize, src: 0, len: 4 },
                Segment { block: 0, pos: 0, src: 4, len: 7 },
            ]
        );
    }

    #[test]
    fn test_plan_wrap_many_times() {
        let segs = plan(1, 11, &FileOptions::circular(3));
        assert_eq!(planned_len(&segs), 11);
        assert_eq!(segs[0], Segment { block: 0, pos: 1, src: 0, len: 2 });
        assert!(segs.iter().skip(1).all(|s| s.pos == 0 && s.block == 0));
        assert_eq!(segs.last().unwrap().len, 3);
    }

    #[test]
    fn test_plan_small_cap_inside_block() {
        let segs = plan(B + 2, 100, &FileOptions::with_max_size(B + 10));
        assert_eq!(segs, vec![Segment { block: 1, pos: 2, src: 0, len: 8 }]);
    }
}
