//! Shared helpers for the agent's integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::Router;
use mediadash_agent::config::{Config, ServiceTarget};

/// Serve `app` on an ephemeral loopback port for the rest of the test.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    addr
}

// Nothing listens on port 1; connections are refused immediately.
pub const DEAD_URL: &str = "http://127.0.0.1:1";

/// A config where every upstream is unreachable and every file lives in `dir`.
pub fn offline_config(dir: &Path) -> Config {
    Config {
        qb_url: DEAD_URL.into(),
        rclone_url: DEAD_URL.into(),
        cloud_sync_status_file: dir.join("cloud-sync-status.json"),
        services: vec![
            ServiceTarget {
                name: "jellyfin".into(),
                url: DEAD_URL.into(),
            },
            ServiceTarget {
                name: "sonarr".into(),
                url: DEAD_URL.into(),
            },
            ServiceTarget {
                name: "radarr".into(),
                url: DEAD_URL.into(),
            },
        ],
        disk_path: dir.to_path_buf(),
        crontab_path: dir.join("crontab"),
        log_dir: dir.to_path_buf(),
        status_interval: Duration::from_millis(200),
        probe_timeout: Duration::from_millis(1500),
        health_timeout: Duration::from_millis(500),
        tail_poll: Duration::from_millis(20),
        ..Config::default()
    }
}
