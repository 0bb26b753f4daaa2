//! Types that mirror the agent's JSON schema.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Disk {
    pub used: u64,
    pub total: u64,
    pub free: u64,
    pub percentage: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Torrent {
    pub name: String,
    pub progress: f64,
    pub speed: f64,
    pub state: String,
    pub size: f64,
    pub downloaded: f64,
    pub seeds: i64,
    pub peers: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Transfer {
    pub name: String,
    pub size: f64,
    pub progress: u32,
    pub speed: f64,
    pub eta: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncStats {
    pub speed: f64,
    pub bytes: u64,
    pub total_bytes: u64,
    pub transfers: u64,
    pub checks: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CloudSync {
    pub active: bool,
    pub transfers: Vec<Transfer>,
    pub stats: SyncStats,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Status {
    pub disk: Disk,
    pub downloads: Vec<Torrent>,
    pub services: Services,
    pub crons: Vec<String>,
    pub cloud_sync: CloudSync,
}

/// Service name -> "online" | "offline", in the order the agent sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Services(pub Vec<(String, String)>);

impl Services {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, s)| (n.as_str(), s.as_str()))
    }
}

impl<'de> Deserialize<'de> for Services {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMap;

        impl<'de> Visitor<'de> for OrderedMap {
            type Value = Services;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of service name to state")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Services, A::Error> {
                let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, String>()? {
                    out.push(entry);
                }
                Ok(Services(out))
            }
        }

        deserializer.deserialize_map(OrderedMap)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LogLine {
    #[serde(rename = "type")]
    pub log_type: String,
    pub line: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum AgentEvent {
    StatusUpdate(Status),
    LogLine(LogLine),
}
