//! Data types sent to viewers over WebSocket and the pull endpoints.
//! Keep this module minimal and stable: it defines the wire format.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskUsage {
    pub used: u64,
    pub total: u64,
    pub free: u64,
    pub percentage: u64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TorrentEntry {
    pub name: String,
    pub progress: f64,
    pub speed: f64,
    pub state: String,
    pub size: f64,
    pub downloaded: f64,
    pub seeds: i64,
    pub peers: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SyncTransfer {
    pub name: String,
    pub size: f64,
    pub progress: u32,
    pub speed: f64,
    pub eta: u64,
}

#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub speed: f64,
    pub bytes: u64,
    pub total_bytes: u64,
    pub transfers: u64,
    pub checks: u64,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct CloudSync {
    pub active: bool,
    pub transfers: Vec<SyncTransfer>,
    pub stats: SyncStats,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Online,
    #[default]
    Offline,
}

/// Service name -> health, kept in configured order.
/// Serialized as a JSON object whose keys follow that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceStates(pub Vec<(String, HealthState)>);

impl ServiceStates {
    pub fn get(&self, name: &str) -> Option<HealthState> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, s)| *s)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ServiceStates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, state) in &self.0 {
            map.serialize_entry(name, state)?;
        }
        map.end()
    }
}

/// One complete aggregation result. Every field is always present.
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub disk: DiskUsage,
    pub downloads: Vec<TorrentEntry>,
    pub services: ServiceStates,
    pub crons: Vec<String>,
    pub cloud_sync: CloudSync,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LogLine {
    #[serde(rename = "type")]
    pub log_type: String,
    pub line: String,
}

/// Frames pushed to a viewer.
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    StatusUpdate(StatusSnapshot),
    LogLine(LogLine),
}

/// Frames received from a viewer.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    SubscribeLog(String),
}

impl From<LogLine> for ServerEvent {
    fn from(line: LogLine) -> Self {
        ServerEvent::LogLine(line)
    }
}
