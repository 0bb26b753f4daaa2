//! Plain-text rendering of agent events for the terminal.

use std::fmt::Write;

use chrono::{DateTime, Local};

use crate::types::{LogLine, Status};

pub fn status_block(status: &Status, at: DateTime<Local>) -> String {
    let mut out = String::new();
    let d = &status.disk;
    let _ = writeln!(
        out,
        "[{}] disk {}G/{}G ({}%, {}G free)",
        at.format("%H:%M:%S"),
        d.used,
        d.total,
        d.percentage,
        d.free
    );

    let services: Vec<String> = status
        .services
        .iter()
        .map(|(name, state)| {
            let mark = if state == "online" { "+" } else { "-" };
            format!("{mark}{name}")
        })
        .collect();
    let _ = writeln!(out, "  services: {}", services.join(" "));

    for t in &status.downloads {
        let _ = writeln!(
            out,
            "  dl {:>5.1}% {:>6.1} MB/s {:>8.2}/{:.2} GB  {}  [{}] s{} p{}",
            t.progress, t.speed, t.downloaded, t.size, t.name, t.state, t.seeds, t.peers
        );
    }

    let sync = &status.cloud_sync;
    if sync.active {
        for t in &sync.transfers {
            let _ = writeln!(
                out,
                "  sync {:>3}% {:>6.1} MB/s eta {}s  {}",
                t.progress, t.speed, t.eta, t.name
            );
        }
    } else {
        let _ = writeln!(out, "  sync idle");
    }

    if !status.crons.is_empty() {
        let _ = writeln!(out, "  {} cron jobs", status.crons.len());
    }
    out
}

pub fn log_line(line: &LogLine) -> String {
    format!("{:<12} | {}", line.log_type, line.line)
}
