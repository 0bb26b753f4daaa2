//! Log tail registry: per (viewer, log type) watchers that replay the end of
//! a log file and then follow it.
//!
//! Every watcher is a task owned by its registry entry. Removing the entry
//! (re-subscribe, unsubscribe, viewer teardown) aborts the task before the
//! registry lock is released, so a detached watcher never emits again.

use std::collections::HashMap;
use std::fmt;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::types::LogLine;

const MAX_LOG_TYPE_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewerId(pub u64);

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "viewer-{}", self.0)
    }
}

/// A log name that is safe to turn into `<log_dir>/<name>.log`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogType(String);

impl LogType {
    pub fn parse(raw: &str) -> Option<Self> {
        let ok = !raw.is_empty()
            && raw.len() <= MAX_LOG_TYPE_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        ok.then(|| LogType(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum TailError {
    #[error("log file removed")]
    Removed,
    #[error("log file truncated")]
    Truncated,
    #[error("log file replaced")]
    Rotated,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

type Key = (ViewerId, LogType);

struct Watcher {
    task: JoinHandle<()>,
    stop: Arc<AtomicBool>,
}

impl Drop for Watcher {
    fn drop(&mut self) {
        // The flag covers a poll already in flight on another worker.
        self.stop.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

pub struct TailRegistry {
    log_dir: PathBuf,
    replay_lines: usize,
    poll: Duration,
    watchers: Mutex<HashMap<Key, Watcher>>,
}

impl TailRegistry {
    pub fn new(log_dir: impl Into<PathBuf>, replay_lines: usize, poll: Duration) -> Self {
        Self {
            log_dir: log_dir.into(),
            replay_lines,
            poll,
            watchers: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Key, Watcher>> {
        self.watchers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Path of a log type's file, or None for names that are not log types.
    pub fn log_path(&self, raw_type: &str) -> Option<PathBuf> {
        LogType::parse(raw_type).map(|t| self.path_for(&t))
    }

    fn path_for(&self, log_type: &LogType) -> PathBuf {
        self.log_dir.join(format!("{}.log", log_type.as_str()))
    }

    /// Replace the watcher for `(viewer, raw_type)`: replay the last lines of
    /// the file into `sink`, then follow appends. Returns false when the log
    /// does not exist (nothing is sent and no watcher is attached).
    pub fn subscribe<T>(&self, viewer: ViewerId, raw_type: &str, sink: mpsc::Sender<T>) -> bool
    where
        T: From<LogLine> + Send + 'static,
    {
        let Some(log_type) = LogType::parse(raw_type) else {
            debug!("{viewer}: ignoring subscription to invalid log type {raw_type:?}");
            return false;
        };
        let path = self.path_for(&log_type);
        let key = (viewer, log_type.clone());

        let mut watchers = self.lock();
        // Old watcher is aborted here, before the new one is spawned.
        watchers.remove(&key);
        if !path.is_file() {
            debug!("{viewer}: no log file for {log_type}");
            return false;
        }

        let stop = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(follow(
            path,
            log_type,
            self.replay_lines,
            self.poll,
            sink,
            Arc::clone(&stop),
        ));
        watchers.insert(key, Watcher { task, stop });
        true
    }

    /// Detach one subscription. Returns whether one existed.
    pub fn remove(&self, viewer: ViewerId, raw_type: &str) -> bool {
        match LogType::parse(raw_type) {
            Some(t) => self.lock().remove(&(viewer, t)).is_some(),
            None => false,
        }
    }

    /// Detach every subscription of `viewer`. Returns how many were released.
    pub fn remove_viewer(&self, viewer: ViewerId) -> usize {
        let mut watchers = self.lock();
        let before = watchers.len();
        watchers.retain(|(v, _), _| *v != viewer);
        before - watchers.len()
    }

    /// Subscriptions of `viewer`, including ones whose watcher has stopped.
    pub fn viewer_count(&self, viewer: ViewerId) -> usize {
        self.lock().keys().filter(|(v, _)| *v == viewer).count()
    }

    /// Watchers still running, across all viewers.
    pub fn active_count(&self) -> usize {
        self.lock().values().filter(|w| !w.task.is_finished()).count()
    }

    /// Last `n` non-blank lines of a log. Absent or invalid logs are empty.
    pub async fn tail_lines(&self, raw_type: &str, n: usize) -> Result<Vec<String>, TailError> {
        let Some(path) = self.log_path(raw_type) else {
            return Ok(Vec::new());
        };
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(last_nonblank(&String::from_utf8_lossy(&bytes), n)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Last `n` non-blank lines of `content`, in file order.
pub fn last_nonblank(content: &str, n: usize) -> Vec<String> {
    let lines: Vec<&str> = content
        .split('\n')
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .collect();
    let skip = lines.len().saturating_sub(n);
    lines[skip..].iter().map(|l| l.to_string()).collect()
}

async fn follow<T: From<LogLine>>(
    path: PathBuf,
    log_type: LogType,
    replay: usize,
    poll: Duration,
    sink: mpsc::Sender<T>,
    stop: Arc<AtomicBool>,
) {
    let mut cursor = match Cursor::open(&path).await {
        Ok(c) => c,
        Err(e) => {
            warn!("tail of {log_type} failed to start: {e}");
            return;
        }
    };
    for line in last_nonblank(&cursor.history, replay) {
        if !emit(&sink, &stop, &log_type, line).await {
            return;
        }
    }
    cursor.history = String::new();

    let mut ticker = tokio::time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match cursor.read_appended(&path).await {
            Ok(lines) => {
                for line in lines {
                    if !emit(&sink, &stop, &log_type, line).await {
                        debug!("tail of {log_type}: viewer gone");
                        return;
                    }
                }
            }
            Err(e) => {
                warn!("tail of {log_type} stopped: {e}");
                return;
            }
        }
    }
}

async fn emit<T: From<LogLine>>(
    sink: &mpsc::Sender<T>,
    stop: &AtomicBool,
    log_type: &LogType,
    line: String,
) -> bool {
    if stop.load(Ordering::SeqCst) {
        return false;
    }
    let event = LogLine {
        log_type: log_type.as_str().to_string(),
        line,
    };
    sink.send(T::from(event)).await.is_ok()
}

/// Read position in a followed file. Replay and follow share `offset`, so the
/// boundary between them neither drops nor repeats bytes.
struct Cursor {
    offset: u64,
    file_id: Option<u64>,
    pending: Vec<u8>,
    history: String,
}

impl Cursor {
    /// History holds complete lines only. A line still being written is
    /// parked in `pending` and finished by the follow side.
    async fn open(path: &Path) -> Result<Self, TailError> {
        let mut bytes = tokio::fs::read(path).await?;
        let meta = tokio::fs::metadata(path).await?;
        let offset = bytes.len() as u64;
        let complete = bytes.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
        let pending = bytes.split_off(complete);
        Ok(Self {
            offset,
            file_id: file_id(&meta),
            pending,
            history: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    /// Complete, non-blank lines appended since the last call. A trailing
    /// fragment without newline is held back until it is finished.
    async fn read_appended(&mut self, path: &Path) -> Result<Vec<String>, TailError> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(TailError::Removed),
            Err(e) => return Err(e.into()),
        };
        if self.file_id.is_some() && file_id(&meta) != self.file_id {
            return Err(TailError::Rotated);
        }
        let len = meta.len();
        if len < self.offset {
            return Err(TailError::Truncated);
        }
        if len == self.offset {
            return Ok(Vec::new());
        }

        let mut file = tokio::fs::File::open(path).await?;
        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut buf = Vec::with_capacity((len - self.offset) as usize);
        let n = file.take(len - self.offset).read_to_end(&mut buf).await?;
        self.offset += n as u64;
        self.pending.extend_from_slice(&buf);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let line = line.trim_end_matches('\r');
            if !line.trim().is_empty() {
                lines.push(line.to_string());
            }
        }
        Ok(lines)
    }
}

#[cfg(unix)]
fn file_id(meta: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.ino())
}

#[cfg(not(unix))]
fn file_id(_meta: &std::fs::Metadata) -> Option<u64> {
    None
}
