//! Minimal WebSocket client helpers for talking to the agent.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::types::AgentEvent;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Connect to the agent and return the WS stream
pub async fn connect(url: &str) -> anyhow::Result<WsStream> {
    let (ws, _) = connect_async(url).await?;
    Ok(ws)
}

// Ask the agent to replay and follow one log
pub async fn subscribe_log(ws: &mut WsStream, log_type: &str) -> anyhow::Result<()> {
    let frame = serde_json::json!({ "event": "subscribe-log", "data": log_type });
    ws.send(Message::Text(frame.to_string())).await?;
    Ok(())
}

// Next agent event; None once the connection is closed. Unknown frames are skipped.
pub async fn next_event(ws: &mut WsStream) -> Option<AgentEvent> {
    while let Some(msg) = ws.next().await {
        match msg {
            Ok(Message::Text(json)) => {
                if let Ok(ev) = serde_json::from_str::<AgentEvent>(&json) {
                    return Some(ev);
                }
            }
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
    None
}
