//! Owns the write side of the changed-page bitmap tracker: boot-time
//! reconciliation between on-disk bitmap files and live engine state,
//! and the periodic `follow()` driver.

use std::fs;
use std::path::PathBuf;

use tracing::{error, instrument, warn};

use crate::bitmap_block::{BitmapBlockBuf, BLOCK_SIZE};
use crate::bitmap_file::BitmapFile;
use crate::bitmap_registry::{self, make_file_name};
use crate::error::{BitmapTrackerError, Result};
use crate::follower;
use crate::log::Lsn;
use crate::log_source::LogSource;
use crate::page_set::ModifiedPageSet;

pub struct Controller {
    data_home: PathBuf,
    current_file: BitmapFile,
    out_seq_num: u64,
    start_lsn: Lsn,
    pages: ModifiedPageSet,
    max_bitmap_file_size: u64,
    max_page_size: u32,
}

impl Controller {
    /// Reconcile on-disk bitmap files with the engine's current
    /// checkpoint LSN and open a fresh output file to append into.
    #[instrument(skip(source))]
    pub fn init(
        data_home: PathBuf,
        source: &mut dyn LogSource,
        max_bitmap_file_size: u64,
        max_page_size: u32,
    ) -> Result<Controller> {
        fs::create_dir_all(&data_home)?;

        let tracking_start_lsn = source.checkpoint_lsn().max(source.min_tracked_lsn());

        let latest_entry = bitmap_registry::latest(&data_home)?;
        let (out_seq_num, last_tracked_lsn) = match &latest_entry {
            Some(entry) => {
                let mut file = BitmapFile::open_rw(&entry.path)?;
                let recovered = recover_last_tracked_lsn(&mut file, entry.start_lsn)?;
                (entry.seq_num, recovered)
            }
            None => (0, 0),
        };

        // `name_lsn` is the raw recovered LSN the new file is named
        // after; `start_lsn` is the (possibly `max()`'d up to
        // `min_tracked_lsn`) position tracking actually resumes from.
        // They coincide except in the retrackable-gap case.
        let (start_lsn, name_lsn, retrackable_gap) = if last_tracked_lsn == tracking_start_lsn {
            (last_tracked_lsn, last_tracked_lsn, false)
        } else if last_tracked_lsn < tracking_start_lsn {
            let gap = source.current_lsn().saturating_sub(last_tracked_lsn);
            if gap <= source.log_group_capacity() {
                (
                    last_tracked_lsn.max(source.min_tracked_lsn()),
                    last_tracked_lsn,
                    true,
                )
            } else {
                warn!(
                    last_tracked_lsn,
                    tracking_start_lsn,
                    "redo log no longer covers the tracking gap; incremental backups \
                     before this boundary are unavailable"
                );
                (tracking_start_lsn, tracking_start_lsn, false)
            }
        } else {
            error!(
                last_tracked_lsn,
                tracking_start_lsn, "last tracked LSN is ahead of engine state"
            );
            return Err(BitmapTrackerError::FutureLsnOnRestart {
                last_tracked_lsn,
                tracking_start_lsn,
            });
        };

        let new_seq_num = out_seq_num + 1;
        let path = data_home.join(make_file_name(new_seq_num, name_lsn));
        let current_file = BitmapFile::create(&path)?;

        let mut controller = Controller {
            data_home,
            current_file,
            out_seq_num: new_seq_num,
            start_lsn,
            pages: ModifiedPageSet::new(),
            max_bitmap_file_size,
            max_page_size,
        };

        if retrackable_gap {
            controller.follow(source)?;
        }

        Ok(controller)
    }

    pub fn tracked_lsn(&self) -> Lsn {
        self.start_lsn
    }

    /// Scan the redo log from the last tracked LSN up to the current
    /// checkpoint, accumulate touched pages, and flush them to the
    /// current bitmap file. A no-op if nothing new has been
    /// checkpointed since the last call.
    #[instrument(skip(self, source))]
    pub fn follow(&mut self, source: &mut dyn LogSource) -> Result<()> {
        let new_start = match follower::follow(source, &mut self.pages, self.start_lsn, self.max_page_size)
        {
            Ok(lsn) => lsn,
            Err(err) => {
                warn!(error = %err, "redo log read failed; retrying this interval on the next call");
                return Ok(());
            }
        };
        if new_start == self.start_lsn {
            return Ok(());
        }

        if let Err(err) = self
            .pages
            .flush_to(&mut self.current_file, self.start_lsn, new_start)
        {
            warn!(error = %err, "bitmap file flush failed; retrying this interval on the next call");
            return Ok(());
        }
        self.start_lsn = new_start;

        if self.current_file.size() >= self.max_bitmap_file_size {
            self.rotate()?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        self.out_seq_num += 1;
        let path = self
            .data_home
            .join(make_file_name(self.out_seq_num, self.start_lsn));
        self.current_file = BitmapFile::create(&path)?;
        Ok(())
    }

    /// Release all resources held by the tracker. Equivalent to
    /// dropping the controller; kept as an explicit method to mirror
    /// the tracker's public lifecycle (`init` / `follow` / `shutdown`).
    pub fn shutdown(self) {}
}

/// Scan `file` backward from its end for the last checksum-valid,
/// `is_last_block`-marked block, truncating away any torn tail.
/// Falls back to `name_start_lsn` if no valid terminator is found.
fn recover_last_tracked_lsn(file: &mut BitmapFile, name_start_lsn: Lsn) -> std::io::Result<Lsn> {
    if file.size() % BLOCK_SIZE as u64 != 0 {
        warn!(
            size = file.size(),
            "bitmap file size is not block-aligned; truncating torn tail"
        );
        let aligned = (file.size() / BLOCK_SIZE as u64) * BLOCK_SIZE as u64;
        file.truncate_to(aligned)?;
    }

    let mut block = BitmapBlockBuf::zeroed();
    let mut offset = file.size();
    while offset > 0 {
        offset -= BLOCK_SIZE as u64;
        file.seek_to(offset)?;
        if let Some(true) = file.read_block(&mut block)? {
            let meta = block.meta();
            if meta.is_last_block {
                file.truncate_to(offset + BLOCK_SIZE as u64)?;
                return Ok(meta.end_lsn);
            }
        } else {
            warn!(offset, "bitmap block failed checksum during recovery scan");
        }
    }

    warn!(
        name_start_lsn,
        "no valid batch terminator found in bitmap file; discarding its contents"
    );
    file.truncate_to(0)?;
    Ok(name_start_lsn)
}
