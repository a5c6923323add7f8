pub mod bitmap_block;
pub mod bitmap_file;
pub mod bitmap_iter;
pub mod bitmap_registry;
pub mod config;
pub mod controller;
pub mod error;
pub mod follower;
pub mod log;
pub mod log_source;
pub mod mach;
pub mod mtr0log;
pub mod page_set;
pub mod reflog;
pub mod univ;

// Type (lsn_t) used for all log sequence number storage and arithmetics.
pub type Lsn = u64;

pub const LSN_MAX: Lsn = u64::MAX;
