//! qBittorrent Web API: torrent list mapped to `TorrentEntry`.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::{bytes_to_gb, bytes_to_mb, round1, Probe, ProbeError};
use crate::types::TorrentEntry;

/// Subset of `/api/v2/torrents/info` fields we display.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct QbTorrent {
    pub name: String,
    pub progress: f64,
    pub dlspeed: f64,
    pub state: String,
    pub size: f64,
    pub completed: f64,
    pub num_seeds: i64,
    pub num_leechs: i64,
}

impl From<QbTorrent> for TorrentEntry {
    fn from(t: QbTorrent) -> Self {
        TorrentEntry {
            name: t.name,
            progress: round1(t.progress * 100.0),
            speed: bytes_to_mb(t.dlspeed),
            state: t.state,
            size: bytes_to_gb(t.size),
            downloaded: bytes_to_gb(t.completed),
            seeds: t.num_seeds,
            peers: t.num_leechs,
        }
    }
}

pub struct DownloadClientProbe {
    client: reqwest::Client,
    base: String,
    user: String,
    pass: String,
}

impl DownloadClientProbe {
    pub fn new(
        base: impl Into<String>,
        user: impl Into<String>,
        pass: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        // The SID cookie from the login call is replayed on the torrent query.
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base: base.into(),
            user: user.into(),
            pass: pass.into(),
        })
    }

    async fn login(&self) {
        let res = self
            .client
            .post(format!("{}/api/v2/auth/login", self.base))
            .form(&[("username", &self.user), ("password", &self.pass)])
            .send()
            .await;
        if let Err(e) = res {
            debug!("qbittorrent login failed: {e}");
        }
    }
}

impl Probe for DownloadClientProbe {
    type Output = Vec<TorrentEntry>;

    fn name(&self) -> &str {
        "download-client"
    }

    async fn fetch(&self) -> Result<Vec<TorrentEntry>, ProbeError> {
        self.login().await;
        let resp = self
            .client
            .get(format!("{}/api/v2/torrents/info", self.base))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ProbeError::Status(resp.status().as_u16()));
        }
        let body = resp.text().await?;
        parse_torrents(&body)
    }
}

/// Parse the torrent list body. Anything other than a JSON array is malformed.
pub fn parse_torrents(body: &str) -> Result<Vec<TorrentEntry>, ProbeError> {
    if !body.trim_start().starts_with('[') {
        return Err(ProbeError::Malformed("expected a JSON array".into()));
    }
    let torrents: Vec<QbTorrent> = serde_json::from_str(body)?;
    Ok(torrents.into_iter().map(TorrentEntry::from).collect())
}
