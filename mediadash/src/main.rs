//! Entry point for the mediadash viewer. Parses args, connects and prints events.

use std::env;

use anyhow::Context;
use chrono::Local;

use mediadash::args::{agent_url, parse_args};
use mediadash::render::{log_line, status_block};
use mediadash::types::AgentEvent;
use mediadash::ws::{connect, next_event, subscribe_log};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    let url = agent_url(&parsed.url).map_err(anyhow::Error::msg)?;

    let mut ws = connect(url.as_str())
        .await
        .with_context(|| format!("connecting to {url}"))?;
    for log in &parsed.logs {
        subscribe_log(&mut ws, log).await?;
    }

    while let Some(event) = next_event(&mut ws).await {
        match event {
            AgentEvent::StatusUpdate(status) => {
                print!("{}", status_block(&status, Local::now()));
                if parsed.once {
                    break;
                }
            }
            AgentEvent::LogLine(line) => println!("{}", log_line(&line)),
        }
    }
    Ok(())
}
