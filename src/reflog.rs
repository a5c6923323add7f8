//! Self-contained reference redo log, built only so this crate can
//! drive the follower end to end without a live storage engine
//! attached. Not part of the tracked-page bitmap format; a real
//! engine integration would implement [`LogSource`] against its own
//! log buffer instead of this module.
//!
//! Framing follows the classic InnoDB redo log block layout: a
//! 12-byte header (block number), up to 496 bytes of record data, and
//! a 4-byte trailer checksum. Record encoding reuses
//! [`crate::mtr0log`]'s varint codec.

use std::io;

use crc32c::crc32c;

use crate::log::Lsn;
use crate::log_source::{LogSource, ParsedRecord};
use crate::mach::{mach_read_from_4, mach_write_to_4};
use crate::mtr0log::{mlog_decode_varint, mlog_encode_varint};

pub const LOG_BLOCK_SIZE: usize = 512;
pub const LOG_BLOCK_HDR_SIZE: usize = 12;
pub const LOG_BLOCK_TRL_SIZE: usize = 4;
pub const LOG_BLOCK_DATA_SIZE: usize = LOG_BLOCK_SIZE - LOG_BLOCK_HDR_SIZE - LOG_BLOCK_TRL_SIZE;

pub const DOUBLEWRITE_SPACE: u32 = 0xFFFF_FFFE;

/// Record type codes. Bit pattern is arbitrary (unlike the real log
/// formats, these bytes are never read back by another engine
/// version), but the set of excluded "does not mean a page" types
/// mirrors the original changed-page tracker's classification.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    MultiRecEnd = 0,
    DummyRecord = 1,
    FileCreate = 2,
    FileRename = 3,
    FileDelete = 4,
    FileCreate2 = 5,
    FileCheckpoint = 6,
    Write = 0x10,
}

fn is_page_record(rec_type: u8) -> bool {
    rec_type == RecordKind::Write as u8
}

/// Encode a page-modifying record: `[type][space varint][page varint][body_len varint][body]`.
pub fn encode_page_record(out: &mut Vec<u8>, space_id: u32, page_id: u32, body: &[u8]) {
    out.push(RecordKind::Write as u8);
    mlog_encode_varint(&mut *out, space_id).expect("write to Vec never fails");
    mlog_encode_varint(&mut *out, page_id).expect("write to Vec never fails");
    mlog_encode_varint(&mut *out, body.len() as u32).expect("write to Vec never fails");
    out.extend_from_slice(body);
}

/// Encode a control/namespace record: `[type][space varint = 0][page varint = 0]`.
pub fn encode_control_record(out: &mut Vec<u8>, kind: RecordKind) {
    out.push(kind as u8);
    mlog_encode_varint(&mut *out, 0).expect("write to Vec never fails");
    mlog_encode_varint(&mut *out, 0).expect("write to Vec never fails");
}

/// Decode one record from the front of `buf`. `Ok(None)` means `buf`
/// does not yet hold a complete record (ran out of bytes while
/// decoding a varint, or the body was truncated).
fn decode_record(buf: &[u8]) -> Option<ParsedRecord> {
    if buf.is_empty() {
        return None;
    }
    let rec_type = buf[0];
    let mut cursor = io::Cursor::new(&buf[1..]);
    let space_id = mlog_decode_varint(&mut cursor).ok()?;
    let page_id = mlog_decode_varint(&mut cursor).ok()?;
    let mut pos = 1 + cursor.position() as usize;

    if !is_page_record(rec_type) {
        return Some(ParsedRecord {
            len: pos,
            rec_type,
            space_id,
            page_id,
            is_page_record: false,
        });
    }

    let mut body_cursor = io::Cursor::new(buf.get(pos..)?);
    let body_len = mlog_decode_varint(&mut body_cursor).ok()?;
    pos += body_cursor.position() as usize;
    let body_end = pos.checked_add(body_len as usize)?;
    if buf.len() < body_end {
        return None;
    }
    Some(ParsedRecord {
        len: body_end,
        rec_type,
        space_id,
        page_id,
        is_page_record: true,
    })
}

fn block_checksum_is_ok(block: &[u8]) -> bool {
    if block.len() < LOG_BLOCK_SIZE {
        return false;
    }
    let stored = mach_read_from_4(&block[LOG_BLOCK_SIZE - LOG_BLOCK_TRL_SIZE..]);
    stored == crc32c(&block[..LOG_BLOCK_SIZE - LOG_BLOCK_TRL_SIZE])
}

/// Account for block header/trailer bytes straddled while adding
/// `len` data bytes starting at `lsn`. `lsn` must point into a
/// block's data region (i.e. `lsn % LOG_BLOCK_SIZE >= LOG_BLOCK_HDR_SIZE`).
pub fn calc_lsn_on_data_add(lsn: Lsn, len: u64) -> Lsn {
    let block_size = LOG_BLOCK_SIZE as u64;
    let hdr = LOG_BLOCK_HDR_SIZE as u64;
    let trl = LOG_BLOCK_TRL_SIZE as u64;
    let payload_size = block_size - hdr - trl;

    let frag_len = (lsn % block_size) - hdr;
    let mut lsn_len = len;
    lsn_len += (lsn_len + frag_len) / payload_size * (hdr + trl);
    lsn + lsn_len
}

/// An in-memory redo log, framed into fixed blocks on append, backing
/// [`LogSource`] for tests and the bundled CLI.
pub struct DemoLogSource {
    buf: Vec<u8>,
    cursor: Lsn,
    checkpoint_lsn: Lsn,
    log_group_capacity: u64,
}

impl DemoLogSource {
    /// `first_lsn` is the data-lsn at which the log begins; it must
    /// point into a block's data region (typically `LOG_BLOCK_HDR_SIZE`).
    pub fn new(first_lsn: Lsn, log_group_capacity: u64) -> Self {
        let mut log = DemoLogSource {
            buf: Vec::new(),
            cursor: first_lsn,
            checkpoint_lsn: first_lsn,
            log_group_capacity,
        };
        log.ensure_len(((first_lsn / LOG_BLOCK_SIZE as u64) + 1) * LOG_BLOCK_SIZE as u64);
        log.write_block_header_if_needed();
        log
    }

    pub fn current_lsn(&self) -> Lsn {
        self.cursor
    }

    fn ensure_len(&mut self, len: u64) {
        if (self.buf.len() as u64) < len {
            self.buf.resize(len as usize, 0);
        }
    }

    fn write_block_header_if_needed(&mut self) {
        let block_start = (self.cursor / LOG_BLOCK_SIZE as u64) * LOG_BLOCK_SIZE as u64;
        if self.cursor == block_start {
            self.ensure_len(block_start + LOG_BLOCK_HDR_SIZE as u64);
            mach_write_to_4(
                &mut self.buf[block_start as usize..],
                (block_start / LOG_BLOCK_SIZE as u64) as u32,
            );
            self.cursor += LOG_BLOCK_HDR_SIZE as u64;
        }
    }

    fn finalize_open_block(&mut self) {
        let block_start = (self.cursor / LOG_BLOCK_SIZE as u64) * LOG_BLOCK_SIZE as u64;
        self.ensure_len(block_start + LOG_BLOCK_SIZE as u64);
        let checksum = crc32c(
            &self.buf[block_start as usize..block_start as usize + LOG_BLOCK_SIZE - LOG_BLOCK_TRL_SIZE],
        );
        mach_write_to_4(
            &mut self.buf[block_start as usize + LOG_BLOCK_SIZE - LOG_BLOCK_TRL_SIZE..],
            checksum,
        );
    }

    fn write_bytes(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            self.write_block_header_if_needed();
            let block_start = (self.cursor / LOG_BLOCK_SIZE as u64) * LOG_BLOCK_SIZE as u64;
            let data_end = block_start + (LOG_BLOCK_SIZE - LOG_BLOCK_TRL_SIZE) as u64;
            let room = (data_end - self.cursor) as usize;
            let n = room.min(bytes.len());
            self.ensure_len(self.cursor + n as u64);
            let start = self.cursor as usize;
            self.buf[start..start + n].copy_from_slice(&bytes[..n]);
            self.cursor += n as u64;
            bytes = &bytes[n..];
            if self.cursor == data_end {
                self.finalize_open_block();
                self.cursor = block_start + LOG_BLOCK_SIZE as u64;
            }
        }
    }

    /// Append one mini-transaction worth of page records, terminated
    /// by a `MultiRecEnd` marker, and advance the checkpoint LSN past
    /// it. Returns the LSN range the records occupy.
    pub fn append_mtr(&mut self, pages: &[(u32, u32)]) -> (Lsn, Lsn) {
        let start = self.cursor;
        let mut bytes = Vec::new();
        for &(space_id, page_id) in pages {
            encode_page_record(&mut bytes, space_id, page_id, &[0xAB; 4]);
        }
        encode_control_record(&mut bytes, RecordKind::MultiRecEnd);
        self.write_bytes(&bytes);
        self.finalize_open_block();
        self.checkpoint_lsn = self.cursor;
        (start, self.cursor)
    }

    pub fn set_checkpoint_lsn(&mut self, lsn: Lsn) {
        self.checkpoint_lsn = lsn;
    }

    /// Flip a byte in the trailer checksum of the block covering `lsn`,
    /// simulating on-disk corruption.
    #[cfg(test)]
    pub(crate) fn corrupt_block_checksum(&mut self, lsn: Lsn) {
        let block_start = (lsn / LOG_BLOCK_SIZE as u64) * LOG_BLOCK_SIZE as u64;
        let trl_start = block_start as usize + LOG_BLOCK_SIZE - LOG_BLOCK_TRL_SIZE;
        self.buf[trl_start] ^= 0xFF;
    }
}

impl LogSource for DemoLogSource {
    fn log_block_size(&self) -> usize {
        LOG_BLOCK_SIZE
    }

    fn log_block_hdr_size(&self) -> usize {
        LOG_BLOCK_HDR_SIZE
    }

    fn log_block_trl_size(&self) -> usize {
        LOG_BLOCK_TRL_SIZE
    }

    fn doublewrite_space(&self) -> u32 {
        DOUBLEWRITE_SPACE
    }

    fn log_start_lsn(&self) -> Lsn {
        0
    }

    fn checkpoint_lsn(&self) -> Lsn {
        self.checkpoint_lsn
    }

    fn current_lsn(&self) -> Lsn {
        self.cursor
    }

    fn log_group_capacity(&self) -> u64 {
        self.log_group_capacity
    }

    fn read_log_segment(&mut self, from_lsn: Lsn, to_lsn: Lsn, buf: &mut [u8]) -> io::Result<usize> {
        let from = from_lsn as usize;
        let to = (to_lsn as usize).min(self.buf.len());
        if from >= to {
            return Ok(0);
        }
        let n = (to - from).min(buf.len());
        buf[..n].copy_from_slice(&self.buf[from..from + n]);
        Ok(n)
    }

    fn block_checksum_is_ok_or_old_format(&self, block: &[u8]) -> bool {
        block_checksum_is_ok(block)
    }

    fn parse_log_record(&self, buf: &[u8]) -> ParsedRecord {
        decode_record(buf).unwrap_or(ParsedRecord::NEED_MORE_DATA)
    }

    fn calc_lsn_on_data_add(&self, lsn: Lsn, len: u64) -> Lsn {
        calc_lsn_on_data_add(lsn, len)
    }
}
