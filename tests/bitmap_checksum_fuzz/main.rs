use bolero::check;

use ibtrack::bitmap_block::{BitmapBlockBuf, BlockMeta, PAGES_PER_BLOCK};

fn main() {
    check!()
        .with_type::<(u64, u64, u32, u32, bool, Vec<u16>)>()
        .for_each(
            |(start_lsn, end_lsn, space_id, first_page_id, is_last_block, bits)| {
                let first_page_id = (*first_page_id / PAGES_PER_BLOCK) * PAGES_PER_BLOCK;

                let mut block = BitmapBlockBuf::zeroed();
                block.set_meta(&BlockMeta {
                    is_last_block: *is_last_block,
                    start_lsn: *start_lsn,
                    end_lsn: *end_lsn,
                    space_id: *space_id,
                    first_page_id,
                });
                for &bit in bits {
                    let page_id = first_page_id + (bit as u32 % PAGES_PER_BLOCK);
                    block.set_bit(page_id);
                }
                block.finalize_checksum();

                assert!(block.checksum_ok());
                let meta = block.meta();
                assert_eq!(meta.start_lsn, *start_lsn);
                assert_eq!(meta.end_lsn, *end_lsn);
                assert_eq!(meta.space_id, *space_id);
                assert_eq!(meta.first_page_id, first_page_id);
                assert_eq!(meta.is_last_block, *is_last_block);

                // A single flipped bit anywhere in the checksummed region
                // must be detected.
                let mut corrupted = block.clone();
                corrupted.as_bytes_mut()[10] ^= 0x01;
                assert!(!corrupted.checksum_ok());
            },
        );
}
