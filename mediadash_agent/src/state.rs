//! Shared agent state: configuration, the stateless aggregator and the tail registry.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::aggregator::StatusAggregator;
use crate::config::Config;
use crate::tail::{TailRegistry, ViewerId};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub aggregator: Arc<StatusAggregator>,
    pub tails: Arc<TailRegistry>,

    // Session bookkeeping
    pub next_viewer: Arc<AtomicU64>,
    pub viewer_count: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let aggregator = StatusAggregator::new(&config)?;
        let tails = TailRegistry::new(&config.log_dir, config.tail_push_lines, config.tail_poll);
        Ok(Self {
            config: Arc::new(config),
            aggregator: Arc::new(aggregator),
            tails: Arc::new(tails),
            next_viewer: Arc::new(AtomicU64::new(1)),
            viewer_count: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Fresh id for a new connection; ids are never reused.
    pub fn allocate_viewer(&self) -> ViewerId {
        ViewerId(self.next_viewer.fetch_add(1, Ordering::Relaxed))
    }
}
