//! Log tail registry: replay, follow, replacement and teardown.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use mediadash_agent::tail::{last_nonblank, LogType, TailRegistry, ViewerId};
use mediadash_agent::types::LogLine;
use tokio::sync::mpsc;
use tokio::time::timeout;

const POLL: Duration = Duration::from_millis(20);
const WAIT: Duration = Duration::from_secs(2);
// Long enough for several polls of a watcher that should stay silent.
const QUIET: Duration = Duration::from_millis(300);

fn append(path: &Path, text: &str) {
    let mut f = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .expect("open log");
    f.write_all(text.as_bytes()).expect("append");
}

async fn next_line(rx: &mut mpsc::Receiver<LogLine>) -> LogLine {
    timeout(WAIT, rx.recv())
        .await
        .expect("line within deadline")
        .expect("channel open")
}

async fn assert_silent(rx: &mut mpsc::Receiver<LogLine>) {
    match timeout(QUIET, rx.recv()).await {
        Err(_) | Ok(None) => {}
        Ok(Some(line)) => panic!("unexpected line {line:?}"),
    }
}

#[test]
fn log_type_names_are_restricted() {
    assert!(LogType::parse("sonarr").is_some());
    assert!(LogType::parse("cloud-sync_2").is_some());
    assert!(LogType::parse("").is_none());
    assert!(LogType::parse("../etc/passwd").is_none());
    assert!(LogType::parse("a/b").is_none());
    assert!(LogType::parse("sync.old").is_none());
    assert!(LogType::parse(&"x".repeat(65)).is_none());
}

#[test]
fn last_nonblank_keeps_file_order() {
    let content = "one\n\ntwo\r\n   \nthree\nfour\n";
    assert_eq!(last_nonblank(content, 2), vec!["three", "four"]);
    assert_eq!(last_nonblank(content, 10), vec!["one", "two", "three", "four"]);
    assert!(last_nonblank("", 5).is_empty());
    assert!(last_nonblank(content, 0).is_empty());
}

#[tokio::test]
async fn replay_skips_blank_lines_then_follows_appends() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sonarr.log");
    std::fs::write(&path, "a\n\nb\n").expect("write log");

    let registry = TailRegistry::new(dir.path(), 50, POLL);
    let (tx, mut rx) = mpsc::channel::<LogLine>(16);
    assert!(registry.subscribe(ViewerId(1), "sonarr", tx));

    assert_eq!(next_line(&mut rx).await.line, "a");
    assert_eq!(next_line(&mut rx).await.line, "b");

    append(&path, "c\n");
    let live = next_line(&mut rx).await;
    assert_eq!(
        live,
        LogLine {
            log_type: "sonarr".into(),
            line: "c".into()
        }
    );
    assert_silent(&mut rx).await;
}

#[tokio::test]
async fn replay_is_limited_to_the_configured_tail() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("radarr.log");
    let content: String = (1..=10).map(|i| format!("line {i}\n")).collect();
    std::fs::write(&path, content).expect("write log");

    let registry = TailRegistry::new(dir.path(), 3, POLL);
    let (tx, mut rx) = mpsc::channel::<LogLine>(16);
    registry.subscribe(ViewerId(1), "radarr", tx);

    for expected in ["line 8", "line 9", "line 10"] {
        assert_eq!(next_line(&mut rx).await.line, expected);
    }
    assert_silent(&mut rx).await;
}

#[tokio::test]
async fn partial_lines_wait_for_their_newline() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sync.log");
    std::fs::write(&path, "").expect("write log");

    let registry = TailRegistry::new(dir.path(), 50, POLL);
    let (tx, mut rx) = mpsc::channel::<LogLine>(16);
    registry.subscribe(ViewerId(1), "sync", tx);

    append(&path, "upload sta");
    assert_silent(&mut rx).await;
    append(&path, "rted\n\nupload done\n");
    assert_eq!(next_line(&mut rx).await.line, "upload started");
    assert_eq!(next_line(&mut rx).await.line, "upload done");
}

#[tokio::test]
async fn line_in_progress_at_subscribe_is_delivered_whole() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sync.log");
    std::fs::write(&path, "done\nhal").expect("write log");

    let registry = TailRegistry::new(dir.path(), 50, POLL);
    let (tx, mut rx) = mpsc::channel::<LogLine>(16);
    registry.subscribe(ViewerId(1), "sync", tx);

    assert_eq!(next_line(&mut rx).await.line, "done");
    assert_silent(&mut rx).await;
    append(&path, "f written\n");
    assert_eq!(next_line(&mut rx).await.line, "half written");
    assert_silent(&mut rx).await;
}

#[tokio::test]
async fn absent_log_yields_nothing_and_attaches_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = TailRegistry::new(dir.path(), 50, POLL);
    let (tx, mut rx) = mpsc::channel::<LogLine>(16);

    assert!(!registry.subscribe(ViewerId(1), "nope", tx.clone()));
    assert!(!registry.subscribe(ViewerId(1), "../../etc/passwd", tx));
    assert_eq!(registry.viewer_count(ViewerId(1)), 0);
    // Both senders were dropped without being used.
    assert!(timeout(WAIT, rx.recv()).await.expect("closed").is_none());

    assert!(registry.tail_lines("nope", 100).await.expect("absent").is_empty());
    assert!(registry
        .tail_lines("../secret", 100)
        .await
        .expect("invalid")
        .is_empty());
}

#[tokio::test]
async fn resubscribe_replaces_the_previous_watcher() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("jellyfin.log");
    std::fs::write(&path, "old\n").expect("write log");

    let registry = TailRegistry::new(dir.path(), 50, POLL);
    let viewer = ViewerId(7);

    let (tx1, mut rx1) = mpsc::channel::<LogLine>(16);
    registry.subscribe(viewer, "jellyfin", tx1);
    assert_eq!(next_line(&mut rx1).await.line, "old");

    let (tx2, mut rx2) = mpsc::channel::<LogLine>(16);
    registry.subscribe(viewer, "jellyfin", tx2);
    assert_eq!(registry.viewer_count(viewer), 1);
    assert_eq!(next_line(&mut rx2).await.line, "old");

    append(&path, "new\n");
    assert_eq!(next_line(&mut rx2).await.line, "new");

    // The first watcher was released: its channel closes without more lines.
    assert!(timeout(WAIT, rx1.recv()).await.expect("closed").is_none());
    assert_silent(&mut rx2).await;
}

#[tokio::test]
async fn remove_viewer_releases_all_of_its_watchers_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    for name in ["sonarr", "radarr", "prowlarr"] {
        std::fs::write(dir.path().join(format!("{name}.log")), "").expect("write log");
    }
    let registry = TailRegistry::new(dir.path(), 50, POLL);
    let leaving = ViewerId(1);
    let staying = ViewerId(2);

    let (tx, mut rx) = mpsc::channel::<LogLine>(64);
    for name in ["sonarr", "radarr", "prowlarr"] {
        assert!(registry.subscribe(leaving, name, tx.clone()));
    }
    drop(tx);
    let (other_tx, mut other_rx) = mpsc::channel::<LogLine>(64);
    registry.subscribe(staying, "sonarr", other_tx);
    assert_eq!(registry.viewer_count(leaving), 3);

    assert_eq!(registry.remove_viewer(leaving), 3);
    assert_eq!(registry.remove_viewer(leaving), 0);
    assert_eq!(registry.viewer_count(leaving), 0);
    assert_eq!(registry.viewer_count(staying), 1);

    for name in ["sonarr", "radarr", "prowlarr"] {
        append(&dir.path().join(format!("{name}.log")), "after\n");
    }
    // Every sender of the leaving viewer is gone, so the channel just closes.
    assert!(timeout(WAIT, rx.recv()).await.expect("closed").is_none());
    assert_eq!(next_line(&mut other_rx).await.line, "after");

    assert!(registry.remove(staying, "sonarr"));
    assert!(!registry.remove(staying, "sonarr"));
}

#[tokio::test]
async fn truncated_log_stops_only_its_own_watcher() {
    let dir = tempfile::tempdir().expect("tempdir");
    let rotated = dir.path().join("rotated.log");
    let steady = dir.path().join("steady.log");
    std::fs::write(&rotated, "first line of a long log\n").expect("write log");
    std::fs::write(&steady, "").expect("write log");

    let registry = TailRegistry::new(dir.path(), 50, POLL);
    let (tx, mut rx) = mpsc::channel::<LogLine>(16);
    registry.subscribe(ViewerId(1), "rotated", tx.clone());
    registry.subscribe(ViewerId(1), "steady", tx);
    assert_eq!(next_line(&mut rx).await.line, "first line of a long log");

    std::fs::write(&rotated, "x\n").expect("truncate");
    let deadline = tokio::time::Instant::now() + WAIT;
    while registry.active_count() > 1 {
        assert!(tokio::time::Instant::now() < deadline, "watcher did not stop");
        tokio::time::sleep(POLL).await;
    }
    // Dormant until re-subscribed.
    assert_eq!(registry.viewer_count(ViewerId(1)), 2);

    append(&steady, "still here\n");
    let line = next_line(&mut rx).await;
    assert_eq!((line.log_type.as_str(), line.line.as_str()), ("steady", "still here"));
}

#[tokio::test]
async fn pull_reads_last_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let content: String = (1..=150).map(|i| format!("{i}\n\n")).collect();
    std::fs::write(dir.path().join("big.log"), content).expect("write log");

    let registry = TailRegistry::new(dir.path(), 50, POLL);
    let lines = registry.tail_lines("big", 100).await.expect("read");
    assert_eq!(lines.len(), 100);
    assert_eq!(lines.first().map(String::as_str), Some("51"));
    assert_eq!(lines.last().map(String::as_str), Some("150"));
}
