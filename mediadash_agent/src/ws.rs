//! WebSocket upgrade and per-viewer session: periodic status pushes plus the
//! viewer's log subscriptions, all torn down together on disconnect.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::aggregator::StatusAggregator;
use crate::state::AppState;
use crate::tail::{TailRegistry, ViewerId};
use crate::types::{ClientEvent, ServerEvent};

// Frames queued for one viewer before producers wait on the socket.
const OUTBOUND_CAPACITY: usize = 256;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerEvent>(OUTBOUND_CAPACITY);
    let mut session = ViewerSession::start(&state, out_tx);
    let id = session.id();

    // Single writer: the ticker and every watcher of this viewer feed out_rx.
    let mut writer = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let js = match serde_json::to_string(&event) {
                Ok(js) => js,
                Err(e) => {
                    warn!("{id}: dropping unserializable frame: {e}");
                    continue;
                }
            };
            if sink.send(Message::Text(js)).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => session.handle_text(&text),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = &mut writer => {
                debug!("{id}: socket write failed");
                break;
            }
        }
    }

    session.terminate();
    writer.abort();
}

/// Server side of one connected viewer. Owns the status ticker and, through
/// the registry, the viewer's log watchers.
pub struct ViewerSession {
    id: ViewerId,
    tails: Arc<TailRegistry>,
    outbound: Option<mpsc::Sender<ServerEvent>>,
    ticker: Option<JoinHandle<()>>,
    viewer_count: Arc<AtomicUsize>,
}

impl ViewerSession {
    /// Connecting -> Active: the first tick fires immediately, so the viewer
    /// gets a snapshot right away and then one per interval.
    pub fn start(state: &AppState, outbound: mpsc::Sender<ServerEvent>) -> Self {
        let id = state.allocate_viewer();
        let active = state.viewer_count.fetch_add(1, Ordering::Relaxed) + 1;
        info!("{id} connected ({active} active)");

        let ticker = spawn_ticker(
            id,
            Arc::clone(&state.aggregator),
            state.config.status_interval,
            outbound.clone(),
        );
        Self {
            id,
            tails: Arc::clone(&state.tails),
            outbound: Some(outbound),
            ticker: Some(ticker),
            viewer_count: Arc::clone(&state.viewer_count),
        }
    }

    pub fn id(&self) -> ViewerId {
        self.id
    }

    pub fn is_terminated(&self) -> bool {
        self.outbound.is_none()
    }

    /// Handle one inbound text frame. Unknown or malformed frames are ignored.
    pub fn handle_text(&self, text: &str) {
        match serde_json::from_str::<ClientEvent>(text) {
            Ok(ClientEvent::SubscribeLog(log_type)) => {
                self.subscribe_log(&log_type);
            }
            Err(e) => debug!("{}: ignoring frame {text:?}: {e}", self.id),
        }
    }

    /// Replay + follow `log_type` for this viewer, replacing any earlier
    /// subscription to the same log. Returns whether a watcher was attached.
    pub fn subscribe_log(&self, log_type: &str) -> bool {
        let Some(outbound) = self.outbound.as_ref() else {
            return false;
        };
        let attached = self.tails.subscribe(self.id, log_type, outbound.clone());
        debug!("{}: subscribe {log_type:?} attached={attached}", self.id);
        attached
    }

    /// Active -> Terminated. Stops the ticker and releases every log watcher
    /// of this viewer. Safe to call more than once.
    pub fn terminate(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        let released = self.tails.remove_viewer(self.id);
        if self.outbound.take().is_some() {
            let active = self.viewer_count.fetch_sub(1, Ordering::Relaxed) - 1;
            info!("{} disconnected, released {released} log watchers ({active} active)", self.id);
        }
    }
}

impl Drop for ViewerSession {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn spawn_ticker(
    id: ViewerId,
    aggregator: Arc<StatusAggregator>,
    period: Duration,
    outbound: mpsc::Sender<ServerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match aggregator.gather_guarded().await {
                Ok(snapshot) => {
                    if outbound.send(ServerEvent::StatusUpdate(snapshot)).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("{id}: status tick failed: {e}"),
            }
        }
    })
}
