//! Status aggregation: fan out to every probe, merge into one snapshot.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinError;

use crate::config::Config;
use crate::probes::{
    CloudSyncProbe, CronProbe, DiskProbe, DownloadClientProbe, Probe, ServiceHealthProbe,
};
use crate::types::StatusSnapshot;

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("status aggregation failed: {0}")]
    Task(#[from] JoinError),
}

/// Holds the probes and nothing mutable; safe to share across sessions.
pub struct StatusAggregator {
    disk: DiskProbe,
    downloads: DownloadClientProbe,
    cloud_sync: CloudSyncProbe,
    health: ServiceHealthProbe,
    crons: CronProbe,
    timeout: Duration,
}

impl StatusAggregator {
    pub fn new(cfg: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            disk: DiskProbe::new(&cfg.disk_path),
            downloads: DownloadClientProbe::new(
                &cfg.qb_url,
                &cfg.qb_user,
                &cfg.qb_pass,
                cfg.probe_timeout,
            )?,
            cloud_sync: CloudSyncProbe::new(
                &cfg.rclone_url,
                &cfg.cloud_sync_status_file,
                cfg.probe_timeout,
            )?,
            health: ServiceHealthProbe::new(cfg.services.clone(), cfg.health_timeout)?,
            crons: CronProbe::new(&cfg.crontab_path),
            timeout: cfg.probe_timeout,
        })
    }

    /// One aggregation cycle. Probe failures land as defaults; never errors.
    pub async fn gather_snapshot(&self) -> StatusSnapshot {
        let t = self.timeout;
        let (disk, downloads, cloud_sync, services, crons) = tokio::join!(
            self.disk.probe(t),
            self.downloads.probe(t),
            self.cloud_sync.probe(t),
            self.health.probe_all(),
            self.crons.probe(t),
        );
        StatusSnapshot {
            disk: disk.value(),
            downloads: downloads.value(),
            services,
            crons: crons.value(),
            cloud_sync: cloud_sync.value(),
        }
    }

    /// Run one cycle on its own task so a fault inside it reaches the caller
    /// as an error instead of unwinding through a session or handler.
    pub async fn gather_guarded(self: &Arc<Self>) -> Result<StatusSnapshot, AggregationError> {
        let this = Arc::clone(self);
        Ok(tokio::spawn(async move { this.gather_snapshot().await }).await?)
    }
}
