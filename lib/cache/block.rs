use crate::error::{Error, Result};
use crate::utils::MAX_BLOCK_SIZE;
use std::cmp::min;

/// in memory copy of one block, bytes are always contiguous from 0
#[derive(Debug, Default)]
pub struct CacheBlock {
    data: Vec<u8>,
}

impl CacheBlock {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn from_vec(data: Vec<u8>) -> Result<Self> {
        if data.len() as u64 > MAX_BLOCK_SIZE {
            return Err(Error::Invariant(format!(
                "stored block holds {} bytes, cap is {}",
                data.len(),
                MAX_BLOCK_SIZE
            )));
        }
        Ok(Self { data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// overwrite and/or extend at `pos`, which must not leave a hole
    pub fn write(&mut self, pos: usize, src: &[u8]) -> Result<usize> {
        if pos > self.data.len() {
            return Err(Error::Invariant(format!(
                "write at {} leaves a hole in block of {} bytes",
                pos,
                self.data.len()
            )));
        }
        if (pos + src.len()) as u64 > MAX_BLOCK_SIZE {
            return Err(Error::Invariant(format!(
                "write of {} bytes at {} exceeds block cap {}",
                src.len(),
                pos,
                MAX_BLOCK_SIZE
            )));
        }
        let overlap = min(src.len(), self.data.len() - pos);
        self.data[pos..pos + overlap].copy_from_slice(&src[..overlap]);
        self.data.extend_from_slice(&src[overlap..]);
        Ok(src.len())
    }

    /// copy bytes starting at `pos` into `dst`, short when the block ends first
    pub fn read(&self, pos: usize, dst: &mut [u8]) -> usize {
        if pos >= self.data.len() {
            return 0;
        }
        let n = min(dst.len(), self.data.len() - pos);
        dst[..n].copy_from_slice(&self.data[pos..pos + n]);
        n
    }
}
