//! Probe adapters: bounded-time fetches of one external fact each.
//!
//! A probe never fails its caller. `Probe::probe` runs the fetch under a time
//! limit and turns any failure into the output type's default, tagged as
//! `Probed::Degraded` so callers (and tests) can tell which path was taken.

pub mod cloud_sync;
pub mod cron;
pub mod disk;
pub mod download;
pub mod health;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

pub use cloud_sync::CloudSyncProbe;
pub use cron::CronProbe;
pub use disk::DiskProbe;
pub use download::DownloadClientProbe;
pub use health::{ServiceCheck, ServiceHealthProbe};

const BYTES_PER_MB: f64 = 1_048_576.0;
const BYTES_PER_GB: f64 = 1_073_741_824.0;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("timed out")]
    Timeout,
    #[error("unreachable: {0}")]
    Unreachable(String),
    #[error("unexpected http status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ProbeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProbeError::Timeout
        } else if e.is_decode() {
            ProbeError::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            ProbeError::Status(status.as_u16())
        } else {
            ProbeError::Unreachable(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ProbeError {
    fn from(e: serde_json::Error) -> Self {
        ProbeError::Malformed(e.to_string())
    }
}

/// Outcome of one probe call: the fetched value, or the default plus the reason.
#[derive(Debug)]
pub enum Probed<T> {
    Fresh(T),
    Degraded(T, ProbeError),
}

impl<T> Probed<T> {
    pub fn value(self) -> T {
        match self {
            Probed::Fresh(v) | Probed::Degraded(v, _) => v,
        }
    }

    pub fn as_value(&self) -> &T {
        match self {
            Probed::Fresh(v) | Probed::Degraded(v, _) => v,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Probed::Fresh(_))
    }

    pub fn error(&self) -> Option<&ProbeError> {
        match self {
            Probed::Fresh(_) => None,
            Probed::Degraded(_, e) => Some(e),
        }
    }
}

pub trait Probe: Sync {
    type Output: Default + Send;

    /// Short label used in log lines.
    fn name(&self) -> &str;

    /// One attempt at reading the source. May fail; `probe` absorbs it.
    fn fetch(&self) -> impl Future<Output = Result<Self::Output, ProbeError>> + Send;

    fn probe(&self, limit: Duration) -> impl Future<Output = Probed<Self::Output>> + Send {
        async move {
            let res = match tokio::time::timeout(limit, self.fetch()).await {
                Ok(res) => res,
                Err(_) => Err(ProbeError::Timeout),
            };
            match res {
                Ok(v) => Probed::Fresh(v),
                Err(e) => {
                    warn!("{} probe degraded: {e}", self.name());
                    Probed::Degraded(Self::Output::default(), e)
                }
            }
        }
    }
}

pub(crate) fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub(crate) fn bytes_to_gb(bytes: f64) -> f64 {
    round2(bytes / BYTES_PER_GB)
}

pub(crate) fn bytes_to_mb(bytes: f64) -> f64 {
    round1(bytes / BYTES_PER_MB)
}
