//! Trait boundary standing in for the storage engine's redo log and
//! record parser. The follower (`follower.rs`) depends only on this
//! trait, never on a concrete log format; [`crate::reflog`] is the
//! bundled reference implementation used for tests and the CLI.

use std::io;

use crate::log::Lsn;

/// One decoded redo log record, as reported by [`LogSource::parse_log_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedRecord {
    /// Total encoded length in bytes, including the type byte. Zero
    /// means the buffer did not contain a complete record yet.
    pub len: usize,
    pub rec_type: u8,
    pub space_id: u32,
    pub page_id: u32,
    /// Whether this record identifies a modified page, as opposed to a
    /// namespace/control record (file create/rename/delete, batch end).
    pub is_page_record: bool,
}

impl ParsedRecord {
    pub const NEED_MORE_DATA: ParsedRecord = ParsedRecord {
        len: 0,
        rec_type: 0,
        space_id: 0,
        page_id: 0,
        is_page_record: false,
    };
}

pub trait LogSource {
    fn log_block_size(&self) -> usize;
    fn log_block_hdr_size(&self) -> usize;
    fn log_block_trl_size(&self) -> usize;
    fn doublewrite_space(&self) -> u32;

    /// Smallest LSN the log format can ever address (the start of the
    /// first block's data region).
    fn log_start_lsn(&self) -> Lsn;

    /// Smallest LSN tracking is ever allowed to begin at.
    fn min_tracked_lsn(&self) -> Lsn {
        self.log_start_lsn() + self.log_block_hdr_size() as Lsn
    }

    /// LSN up to which the engine has committed a checkpoint; the
    /// follower never reads or reports past this value.
    fn checkpoint_lsn(&self) -> Lsn;

    /// The engine's current (highest written) LSN, used to decide
    /// whether a tracking gap can still be closed on restart.
    fn current_lsn(&self) -> Lsn;

    /// Total bytes of redo log retained by the engine before the
    /// oldest data is overwritten.
    fn log_group_capacity(&self) -> u64;

    /// Fill `buf` with raw log bytes covering `[from_lsn, to_lsn)`,
    /// returning the number of bytes actually available. Called with
    /// the engine's log mutex conceptually held by the caller.
    fn read_log_segment(&mut self, from_lsn: Lsn, to_lsn: Lsn, buf: &mut [u8]) -> io::Result<usize>;

    fn block_checksum_is_ok_or_old_format(&self, block: &[u8]) -> bool;

    /// Parse one record starting at `buf[0]`. Returns a record with
    /// `len == 0` if `buf` does not yet hold a complete record.
    fn parse_log_record(&self, buf: &[u8]) -> ParsedRecord;

    /// Account for log bytes consumed by a record, including any
    /// block header/trailer bytes straddled along the way.
    fn calc_lsn_on_data_add(&self, lsn: Lsn, len: u64) -> Lsn;
}
