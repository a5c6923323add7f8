//! In-memory accumulation of modified `(space_id, page_id)` pairs
//! between flushes, keyed by block-aligned page ranges.

use std::collections::BTreeMap;

use crate::bitmap_block::{BitmapBlockBuf, BlockMeta, PAGES_PER_BLOCK};
use crate::bitmap_file::BitmapFile;
use crate::log::Lsn;

type Key = (u32, u32);

/// Ordered set of touched bitmap blocks, plus a stack of recycled
/// block buffers so repeated flush cycles do not reallocate.
#[derive(Default)]
pub struct ModifiedPageSet {
    blocks: BTreeMap<Key, Box<BitmapBlockBuf>>,
    free_list: Vec<Box<BitmapBlockBuf>>,
}

impl ModifiedPageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn take_free_block(&mut self) -> Box<BitmapBlockBuf> {
        match self.free_list.pop() {
            Some(mut block) => {
                block.reset();
                block
            }
            None => Box::new(BitmapBlockBuf::zeroed()),
        }
    }

    /// Record that `page_id` of `space_id` was modified.
    pub fn set_page(&mut self, space_id: u32, page_id: u32) {
        let block_start_page = (page_id / PAGES_PER_BLOCK) * PAGES_PER_BLOCK;
        let key = (space_id, block_start_page);
        if !self.blocks.contains_key(&key) {
            let mut block = self.take_free_block();
            block.set_meta(&BlockMeta {
                is_last_block: false,
                start_lsn: 0,
                end_lsn: 0,
                space_id,
                first_page_id: block_start_page,
            });
            self.blocks.insert(key, block);
        }
        self.blocks.get_mut(&key).unwrap().set_bit(page_id);
    }

    /// Write every accumulated block to `file` in key order, stamping
    /// `start_lsn`/`end_lsn` and marking the final block as the batch
    /// terminator, then clear the set and recycle its nodes.
    pub fn flush_to(
        &mut self,
        file: &mut BitmapFile,
        start_lsn: Lsn,
        end_lsn: Lsn,
    ) -> std::io::Result<()> {
        let len = self.blocks.len();
        for (i, (_, mut block)) in std::mem::take(&mut self.blocks).into_iter().enumerate() {
            let mut meta = block.meta();
            meta.start_lsn = start_lsn;
            meta.end_lsn = end_lsn;
            meta.is_last_block = i + 1 == len;
            block.set_meta(&meta);
            block.finalize_checksum();
            file.write_block_and_flush(&block)?;
            self.free_list.push(block);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn set_page_marks_correct_bit() {
        let mut set = ModifiedPageSet::new();
        set.set_page(7, 5);
        let block = set.blocks.get(&(7, 0)).unwrap();
        assert!(block.get_bit(5));
        assert!(!block.get_bit(6));
    }

    #[test]
    fn block_straddle_creates_two_blocks() {
        let mut set = ModifiedPageSet::new();
        set.set_page(1, PAGES_PER_BLOCK - 1);
        set.set_page(1, PAGES_PER_BLOCK);
        assert_eq!(set.blocks.len(), 2);
        assert!(set.blocks.contains_key(&(1, 0)));
        assert!(set.blocks.contains_key(&(1, PAGES_PER_BLOCK)));
    }

    #[test]
    fn flush_orders_blocks_and_marks_terminator() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.xdb");
        let mut file = BitmapFile::create(&path).unwrap();

        let mut set = ModifiedPageSet::new();
        set.set_page(2, 0);
        set.set_page(1, 0);
        set.flush_to(&mut file, 100, 200).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.free_list.len(), 2);

        let mut file = BitmapFile::open_ro(&path).unwrap();
        let mut block = BitmapBlockBuf::zeroed();
        assert_eq!(file.read_block(&mut block).unwrap(), Some(true));
        assert_eq!(block.meta().space_id, 1);
        assert!(!block.meta().is_last_block);

        assert_eq!(file.read_block(&mut block).unwrap(), Some(true));
        assert_eq!(block.meta().space_id, 2);
        assert!(block.meta().is_last_block);
    }

    #[test]
    fn flush_empty_set_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.xdb");
        let mut file = BitmapFile::create(&path).unwrap();
        let mut set = ModifiedPageSet::new();
        set.flush_to(&mut file, 0, 0).unwrap();
        assert_eq!(file.size(), 0);
    }
}
