//! Disk usage of the filesystem holding the downloads directory.

use std::path::{Path, PathBuf};

use sysinfo::Disks;
use tracing::debug;

use super::{Probe, ProbeError};
use crate::types::DiskUsage;

const GIB: u64 = 1 << 30;

pub struct DiskProbe {
    path: PathBuf,
}

impl DiskProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Probe for DiskProbe {
    type Output = DiskUsage;

    fn name(&self) -> &str {
        "disk"
    }

    async fn fetch(&self) -> Result<DiskUsage, ProbeError> {
        let path = self.path.clone();
        let row = tokio::task::spawn_blocking(move || capacity_row(&path))
            .await
            .map_err(|e| ProbeError::Unreachable(format!("disk scan task: {e}")))??;
        debug!("disk: {row}");
        Ok(parse_capacity_row(&row))
    }
}

/// Parse one `<fs> <size>G <used>G <avail>G <pct>% <mount>` row.
/// Missing or unparsable columns become 0.
pub fn parse_capacity_row(row: &str) -> DiskUsage {
    let parts: Vec<&str> = row.split_whitespace().collect();
    if parts.len() < 5 {
        return DiskUsage::default();
    }
    let num = |s: &str, suffix: char| s.trim_end_matches(suffix).parse::<u64>().unwrap_or(0);
    DiskUsage {
        total: num(parts[1], 'G'),
        used: num(parts[2], 'G'),
        free: num(parts[3], 'G'),
        percentage: num(parts[4], '%'),
    }
}

// Renders the mounted filesystem that holds `path` as a capacity row,
// sizes in whole GiB rounded up and the use percentage rounded up.
fn capacity_row(path: &Path) -> Result<String, ProbeError> {
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .filter(|d| path.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().components().count())
        .ok_or_else(|| {
            ProbeError::Unreachable(format!("no mounted filesystem holds {}", path.display()))
        })?;

    let total = disk.total_space();
    let avail = disk.available_space().min(total);
    let used = total - avail;
    let pct = if total == 0 {
        0
    } else {
        (used * 100).div_ceil(total)
    };
    Ok(format!(
        "{} {}G {}G {}G {}% {}",
        disk.name().to_string_lossy().replace(char::is_whitespace, "_"),
        total.div_ceil(GIB),
        used.div_ceil(GIB),
        avail.div_ceil(GIB),
        pct,
        disk.mount_point().display()
    ))
}
