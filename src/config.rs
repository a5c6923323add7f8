use std::path::PathBuf;

use clap::Parser;

use crate::univ::UNIV_PAGE_SIZE_DEF;

/// Command-line configuration for the changed-page bitmap tracker demo.
#[derive(Parser)]
pub struct Config {
    /// Directory holding the bitmap files and the demo redo log.
    #[clap(long, default_value = "./ibtrack-data")]
    pub data_home: PathBuf,

    /// Rotate to a new bitmap file once the current one reaches this
    /// many bytes.
    #[clap(long, default_value_t = 1 << 20)]
    pub max_bitmap_file_size: u64,

    /// Bytes of redo log retained before the oldest data is
    /// overwritten; used to decide whether a tracking gap found at
    /// startup can still be closed.
    #[clap(long, default_value_t = 512 * 1024 * 1024)]
    pub log_group_capacity: u64,

    /// Page size of the simulated tablespace, sizing the follower's
    /// read window (`4 * max_page_size`).
    #[clap(long, default_value_t = UNIV_PAGE_SIZE_DEF)]
    pub max_page_size: u32,

    /// Print the set of changed pages in `[min_lsn, max_lsn)` after
    /// tracking instead of just reporting the new tracked LSN.
    #[clap(long)]
    pub show_range: Option<String>,
}

impl Config {
    /// Parse `--show-range min:max` into an (min_lsn, max_lsn) pair.
    pub fn parse_show_range(&self) -> Option<(u64, u64)> {
        let s = self.show_range.as_ref()?;
        let (min, max) = s.split_once(':')?;
        Some((min.parse().ok()?, max.parse().ok()?))
    }
}
