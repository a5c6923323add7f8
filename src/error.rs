//! Unified error type for the changed-page bitmap tracker.
//!
//! Recoverable conditions (corruption of a single block, a torn write
//! batch, a closeable tracking gap) are logged via `tracing::warn!` at
//! the point they are detected and do not appear here; only the fatal
//! classes from the tracker's error taxonomy produce an `Err`.

use thiserror::Error;

use crate::log::Lsn;

#[derive(Debug, Error)]
pub enum BitmapTrackerError {
    #[error("bitmap tracker I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not initialize bitmap tracking in {data_home}: {reason}")]
    StartupFailed { data_home: String, reason: String },

    #[error(
        "last tracked LSN {last_tracked_lsn} is ahead of the engine's tracking \
         start LSN {tracking_start_lsn}; the on-disk bitmap files do not agree \
         with engine state"
    )]
    FutureLsnOnRestart {
        last_tracked_lsn: Lsn,
        tracking_start_lsn: Lsn,
    },

    #[error("no bitmap file covers the requested range [{min_lsn}, {max_lsn})")]
    NoBitmapFilesInRange { min_lsn: Lsn, max_lsn: Lsn },
}

pub type Result<T> = std::result::Result<T, BitmapTrackerError>;
