//! Read-side traversal over the bitmap files covering an arbitrary
//! `[min_lsn, max_lsn)` request.

use std::path::Path;

use tracing::{instrument, warn};

use crate::bitmap_block::{BitmapBlockBuf, PAGES_PER_BLOCK};
use crate::bitmap_file::BitmapFile;
use crate::bitmap_registry::{self, BitmapFileEntry};
use crate::error::{BitmapTrackerError, Result};
use crate::log::Lsn;

pub struct BitmapIterator {
    files: Vec<BitmapFileEntry>,
    file_idx: usize,
    current: Option<BitmapFile>,
    block: BitmapBlockBuf,
    bit_offset: usize,
    changed: bool,
    saw_terminal_block: bool,
}

impl BitmapIterator {
    #[instrument(skip(data_home))]
    pub fn init(data_home: &Path, min_lsn: Lsn, max_lsn: Lsn) -> Result<Self> {
        let files = bitmap_registry::select_range(data_home, min_lsn, max_lsn)?;
        if files.is_empty() {
            return Err(BitmapTrackerError::NoBitmapFilesInRange { min_lsn, max_lsn });
        }
        let current = Some(BitmapFile::open_ro(&files[0].path)?);
        Ok(BitmapIterator {
            files,
            file_idx: 0,
            current,
            block: BitmapBlockBuf::zeroed(),
            bit_offset: PAGES_PER_BLOCK as usize,
            changed: false,
            saw_terminal_block: true,
        })
    }

    pub fn space_id(&self) -> u32 {
        self.block.meta().space_id
    }

    pub fn page_id(&self) -> u32 {
        self.block.meta().first_page_id + self.bit_offset as u32
    }

    pub fn start_lsn(&self) -> Lsn {
        self.block.meta().start_lsn
    }

    pub fn end_lsn(&self) -> Lsn {
        self.block.meta().end_lsn
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Advance to the next page bit. Returns `false` once every
    /// selected file has been exhausted.
    pub fn next(&mut self) -> std::io::Result<bool> {
        if self.bit_offset + 1 < PAGES_PER_BLOCK as usize {
            self.bit_offset += 1;
            self.changed = self.block.get_bit(self.bit_offset);
            return Ok(true);
        }
        self.advance_block()
    }

    fn advance_block(&mut self) -> std::io::Result<bool> {
        loop {
            let Some(file) = self.current.as_mut() else {
                self.file_idx += 1;
                if self.file_idx >= self.files.len() {
                    return Ok(false);
                }
                self.current = Some(BitmapFile::open_ro(&self.files[self.file_idx].path)?);
                continue;
            };

            match file.read_block(&mut self.block)? {
                Some(true) => {
                    self.saw_terminal_block = self.block.meta().is_last_block;
                    self.bit_offset = 0;
                    self.changed = self.block.get_bit(0);
                    return Ok(true);
                }
                Some(false) => {
                    warn!(
                        path = ?file.path(),
                        offset = file.offset() - crate::bitmap_block::BLOCK_SIZE as u64,
                        "bitmap block failed checksum; skipping"
                    );
                    continue;
                }
                None => {
                    self.diagnose_eof(file);
                    self.current = None;
                }
            }
        }
    }

    fn diagnose_eof(&mut self, file: &BitmapFile) {
        if file.size() % crate::bitmap_block::BLOCK_SIZE as u64 != 0 {
            warn!(path = ?file.path(), size = file.size(), "bitmap file ends with a partial block");
        }
        if !self.saw_terminal_block {
            warn!(path = ?file.path(), "bitmap file run ended without a batch terminator; data may be truncated");
        }
        self.saw_terminal_block = true;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bitmap_registry::make_file_name;
    use crate::page_set::ModifiedPageSet;
    use tempfile::tempdir;

    #[test]
    fn iterates_single_block() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(make_file_name(1, 0));
        let mut file = BitmapFile::create(&path).unwrap();
        let mut pages = ModifiedPageSet::new();
        pages.set_page(3, 5);
        pages.flush_to(&mut file, 0, 100).unwrap();
        drop(file);

        let mut iter = BitmapIterator::init(dir.path(), 0, 100).unwrap();
        assert!(iter.next().unwrap());
        assert!(iter.changed());
        assert_eq!(iter.space_id(), 3);
        assert_eq!(iter.page_id(), 5);

        let mut any_more_set = false;
        while iter.next().unwrap() {
            if iter.changed() {
                any_more_set = true;
            }
        }
        assert!(!any_more_set);
    }

    #[test]
    fn errors_when_range_has_no_files() {
        let dir = tempdir().unwrap();
        let err = BitmapIterator::init(dir.path(), 0, 100);
        assert!(matches!(
            err,
            Err(BitmapTrackerError::NoBitmapFilesInRange { .. })
        ));
    }
}
