use memmap2::{Mmap, MmapOptions};
use std::{fs::File, io, ops::Range, path::Path};

/// A file opened for random read requests.
#[derive(Debug)]
pub struct RandomAccessFile {
    mmap: Mmap,
}

impl RandomAccessFile {
    /// Memory-maps `path` for random reads.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { MmapOptions::new().map(&file)? };

        #[cfg(unix)]
        mmap.advise(memmap2::Advice::Random)?;

        Ok(RandomAccessFile { mmap })
    }

    /// The file's length in bytes.
    #[inline(always)]
    pub fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// The range of bytes specified, or `None` past the end of the file.
    #[inline(always)]
    pub fn read(&self, range: Range<u64>) -> Option<&[u8]> {
        self.mmap.get(range.start as usize..range.end as usize)
    }
}
