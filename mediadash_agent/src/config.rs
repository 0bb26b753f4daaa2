//! Runtime configuration, read once from the environment at startup.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SERVICES: &str =
    "jellyfin:8096,jellyseerr:5055,qbittorrent:8080,prowlarr:9696,radarr:7878,sonarr:8989";

/// One monitored service: display name and the URL probed for reachability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTarget {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub qb_url: String,
    pub qb_user: String,
    pub qb_pass: String,
    pub rclone_url: String,
    pub cloud_sync_status_file: PathBuf,
    pub services: Vec<ServiceTarget>,
    pub disk_path: PathBuf,
    pub crontab_path: PathBuf,
    pub log_dir: PathBuf,
    pub status_interval: Duration,
    pub tail_pull_lines: usize,
    pub tail_push_lines: usize,
    pub probe_timeout: Duration,
    pub health_timeout: Duration,
    pub tail_poll: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            qb_url: "http://qbittorrent:8080".into(),
            qb_user: "admin".into(),
            qb_pass: "adminadmin".into(),
            rclone_url: "http://rclone-mount:5572".into(),
            cloud_sync_status_file: PathBuf::from("/tmp/cloud-sync-status.json"),
            services: parse_services(DEFAULT_SERVICES).unwrap_or_default(),
            disk_path: PathBuf::from("/downloads"),
            crontab_path: PathBuf::from("/var/spool/cron/crontabs/root"),
            log_dir: PathBuf::from("/app/logs"),
            status_interval: Duration::from_millis(5000),
            tail_pull_lines: 100,
            tail_push_lines: 50,
            probe_timeout: Duration::from_millis(10_000),
            health_timeout: Duration::from_millis(2000),
            tail_poll: Duration::from_millis(250),
        }
    }
}

impl Config {
    /// Build from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup; unset or unparsable keys keep their default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("DASHBOARD_PORT") {
            cfg.port = parsed("DASHBOARD_PORT", &v).unwrap_or(cfg.port);
        }
        if let Some(v) = lookup("QB_URL") {
            cfg.qb_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("QB_USER") {
            cfg.qb_user = v;
        }
        if let Some(v) = lookup("QB_PASS") {
            cfg.qb_pass = v;
        }
        if let Some(v) = lookup("RCLONE_RC_URL") {
            cfg.rclone_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("CLOUD_SYNC_STATUS_FILE") {
            cfg.cloud_sync_status_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("DASHBOARD_SERVICES") {
            match parse_services(&v) {
                Some(list) => cfg.services = list,
                None => warn!("DASHBOARD_SERVICES={v:?} is not a valid service list, using defaults"),
            }
        }
        if let Some(v) = lookup("DISK_PATH") {
            cfg.disk_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("CRONTAB_PATH") {
            cfg.crontab_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("LOG_DIR") {
            cfg.log_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("STATUS_INTERVAL_MS") {
            cfg.status_interval = millis("STATUS_INTERVAL_MS", &v).unwrap_or(cfg.status_interval);
        }
        if let Some(v) = lookup("LOG_TAIL_PULL") {
            cfg.tail_pull_lines = parsed("LOG_TAIL_PULL", &v).unwrap_or(cfg.tail_pull_lines);
        }
        if let Some(v) = lookup("LOG_TAIL_PUSH") {
            cfg.tail_push_lines = parsed("LOG_TAIL_PUSH", &v).unwrap_or(cfg.tail_push_lines);
        }
        if let Some(v) = lookup("PROBE_TIMEOUT_MS") {
            cfg.probe_timeout = millis("PROBE_TIMEOUT_MS", &v).unwrap_or(cfg.probe_timeout);
        }
        if let Some(v) = lookup("HEALTH_TIMEOUT_MS") {
            cfg.health_timeout = millis("HEALTH_TIMEOUT_MS", &v).unwrap_or(cfg.health_timeout);
        }
        if let Some(v) = lookup("TAIL_POLL_MS") {
            cfg.tail_poll = millis("TAIL_POLL_MS", &v).unwrap_or(cfg.tail_poll);
        }
        cfg
    }
}

fn parsed<T: std::str::FromStr>(key: &str, raw: &str) -> Option<T> {
    let v = raw.trim().parse::<T>().ok();
    if v.is_none() {
        warn!("{key}={raw:?} is not valid, using default");
    }
    v
}

// Zero-length intervals would spin the ticker and the tail poller.
fn millis(key: &str, raw: &str) -> Option<Duration> {
    parsed::<u64>(key, raw)
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

/// Parse `name:port` (probed as `http://name:port`) or `name=URL` entries,
/// comma separated. Returns None if any entry is malformed or the list is empty.
pub fn parse_services(raw: &str) -> Option<Vec<ServiceTarget>> {
    let mut out: Vec<ServiceTarget> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let target = if let Some((name, url)) = entry.split_once('=') {
            let (name, url) = (name.trim(), url.trim());
            if name.is_empty() || !(url.starts_with("http://") || url.starts_with("https://")) {
                return None;
            }
            ServiceTarget {
                name: name.to_string(),
                url: url.to_string(),
            }
        } else {
            let (name, port) = entry.split_once(':')?;
            let port = port.trim().parse::<u16>().ok()?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            ServiceTarget {
                name: name.to_string(),
                url: format!("http://{name}:{port}"),
            }
        };
        // Last definition of a name wins, first position is kept.
        if let Some(existing) = out.iter_mut().find(|t| t.name == target.name) {
            existing.url = target.url;
        } else {
            out.push(target);
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Resolve the listening port from `--port N`, `--port=N` or `-p N`.
/// The long form wins over the short one; anything unparsable yields `default_port`.
pub fn parse_port<I: IntoIterator<Item = String>>(args: I, default_port: u16) -> u16 {
    let mut it = args.into_iter();
    let _ = it.next(); // program name
    let mut long: Option<String> = None;
    let mut short: Option<String> = None;
    while let Some(a) = it.next() {
        match a.as_str() {
            "--port" => long = it.next(),
            "-p" => short = it.next(),
            _ if a.starts_with("--port=") => {
                if let Some((_, v)) = a.split_once('=') {
                    long = Some(v.to_string());
                }
            }
            _ => {}
        }
    }
    long.or(short)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(default_port)
}
