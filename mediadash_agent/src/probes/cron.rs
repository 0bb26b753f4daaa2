//! Scheduled jobs from the root crontab.

use std::io::ErrorKind;
use std::path::PathBuf;

use super::{Probe, ProbeError};

pub struct CronProbe {
    path: PathBuf,
}

impl CronProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Probe for CronProbe {
    type Output = Vec<String>;

    fn name(&self) -> &str {
        "cron"
    }

    async fn fetch(&self) -> Result<Vec<String>, ProbeError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(parse_crontab(&raw)),
            // No crontab installed is a normal state, not a failure.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Non-blank, non-comment lines, in file order.
pub fn parse_crontab(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
        .map(str::to_string)
        .collect()
}
