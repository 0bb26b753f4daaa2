//! Cloud-sync state: live rclone rc stats, else the sync job's status file.
//!
//! Live stats are authoritative whenever they parse, even with nothing in
//! flight. The status file is only read when the live call failed or returned
//! something that is not a stats object.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::{bytes_to_gb, bytes_to_mb, Probe, ProbeError};
use crate::types::{CloudSync, SyncStats, SyncTransfer};

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RcloneStats {
    speed: f64,
    bytes: u64,
    total_bytes: u64,
    transfers: u64,
    checks: u64,
    transferring: Option<Vec<RcloneTransfer>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RcloneTransfer {
    name: Option<String>,
    size: f64,
    bytes: f64,
    speed: f64,
    eta: Option<u64>,
}

impl From<RcloneTransfer> for SyncTransfer {
    fn from(t: RcloneTransfer) -> Self {
        let progress = if t.size > 0.0 {
            (t.bytes / t.size * 100.0).round().clamp(0.0, 100.0) as u32
        } else {
            0
        };
        SyncTransfer {
            name: t
                .name
                .as_deref()
                .map(basename)
                .unwrap_or_else(|| "unknown".into()),
            size: bytes_to_gb(t.size),
            progress,
            speed: bytes_to_mb(t.speed),
            eta: t.eta.unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StatusFile {
    transfers: Vec<SyncTransfer>,
}

pub struct CloudSyncProbe {
    client: reqwest::Client,
    rc_url: String,
    status_file: PathBuf,
}

impl CloudSyncProbe {
    /// `limit` is the whole probe's budget. The live call gets half of it so
    /// a hung rc endpoint still leaves time to read the status file.
    pub fn new(
        rc_url: impl Into<String>,
        status_file: impl Into<PathBuf>,
        limit: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(limit / 2).build()?;
        Ok(Self {
            client,
            rc_url: rc_url.into(),
            status_file: status_file.into(),
        })
    }

    async fn live(&self) -> Result<CloudSync, ProbeError> {
        let resp = self
            .client
            .post(format!("{}/core/stats", self.rc_url))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ProbeError::Status(resp.status().as_u16()));
        }
        parse_live(&resp.text().await?)
    }

    async fn fallback(&self) -> Result<Vec<SyncTransfer>, ProbeError> {
        let raw = tokio::fs::read_to_string(&self.status_file).await?;
        parse_status_file(&raw)
    }
}

impl Probe for CloudSyncProbe {
    type Output = CloudSync;

    fn name(&self) -> &str {
        "cloud-sync"
    }

    async fn fetch(&self) -> Result<CloudSync, ProbeError> {
        let live_err = match self.live().await {
            Ok(sync) => return Ok(sync),
            Err(e) => e,
        };
        debug!("rclone rc unavailable ({live_err}), reading {}", self.status_file.display());
        match self.fallback().await {
            Ok(transfers) if !transfers.is_empty() => Ok(CloudSync {
                active: true,
                transfers,
                stats: SyncStats::default(),
            }),
            Ok(_) => Err(live_err),
            Err(e) => {
                debug!("sync status file unusable: {e}");
                Err(live_err)
            }
        }
    }
}

/// Parse a live `core/stats` body. Must be a JSON object.
pub fn parse_live(body: &str) -> Result<CloudSync, ProbeError> {
    if !body.trim_start().starts_with('{') {
        return Err(ProbeError::Malformed("expected a JSON object".into()));
    }
    let stats: RcloneStats = serde_json::from_str(body)?;
    let transfers: Vec<SyncTransfer> = stats
        .transferring
        .unwrap_or_default()
        .into_iter()
        .map(SyncTransfer::from)
        .collect();
    Ok(CloudSync {
        active: !transfers.is_empty(),
        transfers,
        stats: SyncStats {
            speed: bytes_to_mb(stats.speed),
            bytes: stats.bytes,
            total_bytes: stats.total_bytes,
            transfers: stats.transfers,
            checks: stats.checks,
        },
    })
}

/// Parse the status file written by the sync job: `{"transfers": [...]}`.
pub fn parse_status_file(raw: &str) -> Result<Vec<SyncTransfer>, ProbeError> {
    if !raw.trim_start().starts_with('{') {
        return Err(ProbeError::Malformed("expected a JSON object".into()));
    }
    let file: StatusFile = serde_json::from_str(raw)?;
    Ok(file
        .transfers
        .into_iter()
        .map(|mut t| {
            t.name = basename(&t.name);
            t
        })
        .collect())
}

fn basename(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}
