//! Enumeration, naming, and rotation of `ib_modified_log_*.xdb` files
//! in the tracker's data directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::log::Lsn;

pub const FILE_NAME_PREFIX: &str = "ib_modified_log_";
pub const FILE_NAME_SUFFIX: &str = ".xdb";

#[derive(Debug, Clone)]
pub struct BitmapFileEntry {
    pub seq_num: u64,
    pub start_lsn: Lsn,
    pub path: PathBuf,
}

pub fn make_file_name(seq_num: u64, start_lsn: Lsn) -> String {
    format!("{FILE_NAME_PREFIX}{seq_num}_{start_lsn}{FILE_NAME_SUFFIX}")
}

/// Parse a directory entry's file name as a bitmap file name, mirroring
/// the original's `sscanf(name, "%[a-z_]%lu_%llu.xdb", ...)` match.
pub fn parse_file_name(name: &str) -> Option<(u64, Lsn)> {
    let rest = name.strip_prefix(FILE_NAME_PREFIX)?;
    let rest = rest.strip_suffix(FILE_NAME_SUFFIX)?;
    let (seq_str, lsn_str) = rest.split_once('_')?;
    if seq_str.is_empty() || !seq_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if lsn_str.is_empty() || !lsn_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let seq_num: u64 = seq_str.parse().ok()?;
    let start_lsn: Lsn = lsn_str.parse().ok()?;
    Some((seq_num, start_lsn))
}

/// List every bitmap file found in `data_home`, in unspecified order.
pub fn list_files(data_home: &Path) -> std::io::Result<Vec<BitmapFileEntry>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(data_home)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if !(file_type.is_file() || file_type.is_symlink()) {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some((seq_num, start_lsn)) = parse_file_name(name) {
            out.push(BitmapFileEntry {
                seq_num,
                start_lsn,
                path: entry.path(),
            });
        }
    }
    Ok(out)
}

/// The most recently rotated-to, non-empty bitmap file, if any.
pub fn latest(data_home: &Path) -> std::io::Result<Option<BitmapFileEntry>> {
    let mut files = list_files(data_home)?;
    files.retain(|f| f.path.metadata().map(|m| m.len() > 0).unwrap_or(false));
    files.sort_by_key(|f| (f.seq_num, f.start_lsn));
    Ok(files.pop())
}

/// Select the ordered run of bitmap files whose LSN interval may
/// overlap `[min_lsn, max_lsn)`, including the single file (if any)
/// whose interval straddles `min_lsn` from below.
///
/// Two-pass scan: pass 1 finds the straddling file and the set of
/// files with `start_lsn` in `[min_lsn, max_lsn)`; pass 2 orders the
/// result by `seq_num` (equivalently, by `start_lsn`, since both are
/// monotone across rotations of a single controller).
pub fn select_range(
    data_home: &Path,
    min_lsn: Lsn,
    max_lsn: Lsn,
) -> std::io::Result<Vec<BitmapFileEntry>> {
    let mut files = list_files(data_home)?;
    files.sort_by_key(|f| (f.start_lsn, f.seq_num));

    let straddle_idx = files
        .iter()
        .enumerate()
        .filter(|(_, f)| f.start_lsn < min_lsn)
        .next_back()
        .map(|(i, _)| i);

    let mut selected: Vec<BitmapFileEntry> = Vec::new();
    if let Some(i) = straddle_idx {
        selected.push(files[i].clone());
    }
    for f in &files {
        if f.start_lsn >= min_lsn && f.start_lsn < max_lsn {
            selected.push(f.clone());
        }
    }
    selected.sort_by_key(|f| f.seq_num);
    selected.dedup_by_key(|f| f.seq_num);
    Ok(selected)
}
