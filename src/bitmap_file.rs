//! A single on-disk file of [`BitmapBlockBuf`] blocks: sequential
//! append-only writer and seekable reader.

use std::fs::{File, OpenOptions};
use std::io::{Read, Result, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::bitmap_block::{BitmapBlockBuf, BLOCK_SIZE};

pub struct BitmapFile {
    file: File,
    path: PathBuf,
    offset: u64,
    size: u64,
}

impl BitmapFile {
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        Ok(BitmapFile {
            file,
            path: path.to_path_buf(),
            offset: 0,
            size: 0,
        })
    }

    pub fn open_rw(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let size = file.metadata()?.len();
        Ok(BitmapFile {
            file,
            path: path.to_path_buf(),
            offset: 0,
            size,
        })
    }

    pub fn open_ro(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        let size = file.metadata()?.len();
        Ok(BitmapFile {
            file,
            path: path.to_path_buf(),
            offset: 0,
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        debug_assert_eq!(offset % BLOCK_SIZE as u64, 0);
        self.file.seek(SeekFrom::Start(offset))?;
        self.offset = offset;
        Ok(())
    }

    /// Read one block at the current offset. Returns `Ok(None)` at a
    /// clean block-aligned EOF; `Ok(Some(false))` for a checksum
    /// failure (the block is still returned via `out`, for diagnostic
    /// use by the caller); `Ok(Some(true))` for a verified block.
    pub fn read_block(&mut self, out: &mut BitmapBlockBuf) -> Result<Option<bool>> {
        debug_assert_eq!(self.offset % BLOCK_SIZE as u64, 0);
        if self.offset + BLOCK_SIZE as u64 > self.size {
            return Ok(None);
        }
        self.file.read_exact(out.as_bytes_mut())?;
        self.offset += BLOCK_SIZE as u64;
        Ok(Some(out.checksum_ok()))
    }

    pub fn write_block_and_flush(&mut self, block: &BitmapBlockBuf) -> Result<()> {
        debug_assert_eq!(self.offset % BLOCK_SIZE as u64, 0);
        self.file.seek(SeekFrom::Start(self.offset))?;
        self.file.write_all(block.as_bytes())?;
        self.file.flush()?;
        self.file.sync_data()?;
        self.offset += BLOCK_SIZE as u64;
        if self.offset > self.size {
            self.size = self.offset;
        }
        Ok(())
    }

    /// Discard everything past `offset`, used to drop a torn tail
    /// discovered during startup recovery.
    pub fn truncate_to(&mut self, offset: u64) -> Result<()> {
        debug_assert_eq!(offset % BLOCK_SIZE as u64, 0);
        self.file.set_len(offset)?;
        self.size = offset;
        if self.offset > offset {
            self.offset = offset;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bitmap_block::BlockMeta;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.xdb");
        let mut block = BitmapBlockBuf::zeroed();
        block.set_meta(&BlockMeta {
            is_last_block: true,
            start_lsn: 10,
            end_lsn: 20,
            space_id: 1,
            first_page_id: 0,
        });
        block.set_bit(3);
        block.finalize_checksum();

        {
            let mut f = BitmapFile::create(&path).unwrap();
            f.write_block_and_flush(&block).unwrap();
        }

        let mut f = BitmapFile::open_ro(&path).unwrap();
        assert_eq!(f.size(), BLOCK_SIZE as u64);
        let mut read_back = BitmapBlockBuf::zeroed();
        let ok = f.read_block(&mut read_back).unwrap();
        assert_eq!(ok, Some(true));
        assert_eq!(read_back.meta(), block.meta());
        assert!(f.read_block(&mut read_back).unwrap().is_none());
    }

    #[test]
    fn truncate_drops_tail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.xdb");
        let mut f = BitmapFile::create(&path).unwrap();
        let block = BitmapBlockBuf::zeroed();
        f.write_block_and_flush(&block).unwrap();
        f.write_block_and_flush(&block).unwrap();
        f.truncate_to(BLOCK_SIZE as u64).unwrap();
        assert_eq!(f.size(), BLOCK_SIZE as u64);
    }
}
