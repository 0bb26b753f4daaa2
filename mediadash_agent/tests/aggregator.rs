//! Whole-cycle aggregation: shape and isolation of probe failures.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use mediadash_agent::aggregator::StatusAggregator;
use mediadash_agent::config::ServiceTarget;
use mediadash_agent::types::HealthState;

#[tokio::test]
async fn everything_unreachable_still_yields_full_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = common::offline_config(dir.path());
    let agg = StatusAggregator::new(&cfg).expect("aggregator");

    let snap = agg.gather_snapshot().await;
    assert!(snap.downloads.is_empty());
    assert!(snap.crons.is_empty());
    assert!(!snap.cloud_sync.active);
    assert!(snap.cloud_sync.transfers.is_empty());
    let names: Vec<&str> = snap.services.names().collect();
    assert_eq!(names, vec!["jellyfin", "sonarr", "radarr"]);
    assert!(snap
        .services
        .0
        .iter()
        .all(|(_, s)| *s == HealthState::Offline));

    // Every top-level key is present on the wire.
    let v = serde_json::to_value(&snap).expect("serialize");
    for key in ["disk", "downloads", "services", "crons", "cloudSync"] {
        assert!(v.get(key).is_some(), "missing {key}");
    }
    for key in ["used", "total", "free", "percentage"] {
        assert!(v["disk"].get(key).is_some(), "missing disk.{key}");
    }
    for key in ["active", "transfers", "stats"] {
        assert!(v["cloudSync"].get(key).is_some(), "missing cloudSync.{key}");
    }
    assert_eq!(v["services"]["sonarr"], "offline");
}

#[tokio::test]
async fn one_healthy_source_is_not_hidden_by_failing_ones() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = Router::new().route("/", get(|| async { "ok" }));
    let addr = common::serve(app).await;

    let mut cfg = common::offline_config(dir.path());
    cfg.services.insert(
        1,
        ServiceTarget {
            name: "prowlarr".into(),
            url: format!("http://{addr}/"),
        },
    );
    std::fs::write(&cfg.crontab_path, "0 4 * * * /scripts/prune.sh\n").expect("crontab");
    let agg = Arc::new(StatusAggregator::new(&cfg).expect("aggregator"));

    let snap = agg.gather_guarded().await.expect("gather");
    let names: Vec<&str> = snap.services.names().collect();
    assert_eq!(names, vec!["jellyfin", "prowlarr", "sonarr", "radarr"]);
    assert_eq!(snap.services.get("prowlarr"), Some(HealthState::Online));
    assert_eq!(snap.services.get("jellyfin"), Some(HealthState::Offline));
    assert_eq!(snap.crons, vec!["0 4 * * * /scripts/prune.sh".to_string()]);
    assert!(snap.downloads.is_empty());

    // Service keys serialize in configured order.
    let js = serde_json::to_string(&snap.services).expect("serialize");
    assert_eq!(
        js,
        r#"{"jellyfin":"offline","prowlarr":"online","sonarr":"offline","radarr":"offline"}"#
    );
}

#[tokio::test]
async fn concurrent_gathers_are_independent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = common::offline_config(dir.path());
    let agg = Arc::new(StatusAggregator::new(&cfg).expect("aggregator"));

    let (a, b, c) = tokio::join!(
        agg.gather_guarded(),
        agg.gather_guarded(),
        agg.gather_guarded()
    );
    let (a, b, c) = (a.expect("a"), b.expect("b"), c.expect("c"));
    assert_eq!(a.services, b.services);
    assert_eq!(b.services, c.services);
}

#[tokio::test]
async fn hung_sync_agent_falls_back_within_one_cycle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = Router::new().route(
        "/core/stats",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            "{}"
        }),
    );
    let addr = common::serve(app).await;

    let mut cfg = common::offline_config(dir.path());
    cfg.rclone_url = format!("http://{addr}");
    cfg.probe_timeout = Duration::from_millis(300);
    std::fs::write(
        &cfg.cloud_sync_status_file,
        r#"{"transfers":[{"name":"/data/show.mkv","size":2.0,"progress":40,"speed":1.5,"eta":60}]}"#,
    )
    .expect("status file");
    let agg = StatusAggregator::new(&cfg).expect("aggregator");

    for _ in 0..5 {
        let snap = agg.gather_snapshot().await;
        assert!(snap.cloud_sync.active);
        assert_eq!(snap.cloud_sync.transfers.len(), 1);
        assert_eq!(snap.cloud_sync.transfers[0].name, "show.mkv");
    }
}
