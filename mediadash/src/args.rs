//! Command-line parsing for the viewer.

use url::Url;

pub const DEFAULT_URL: &str = "ws://127.0.0.1:3000/ws";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArgs {
    pub url: String,
    pub logs: Vec<String>,
    pub once: bool,
}

pub fn usage(prog: &str) -> String {
    format!("Usage: {prog} [--log TYPE|-l TYPE]... [--once] [ws://HOST:PORT/ws]")
}

pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "mediadash".into());
    let mut url: Option<String> = None;
    let mut logs: Vec<String> = Vec::new();
    let mut once = false; // --once

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(usage(&prog)),
            "--log" | "-l" => match it.next() {
                Some(v) if !v.is_empty() => logs.push(v),
                _ => return Err(format!("--log needs a log type. {}", usage(&prog))),
            },
            "--once" => once = true,
            _ if arg.starts_with("--log=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        logs.push(v.to_string());
                    }
                }
            }
            _ => {
                if url.is_none() {
                    url = Some(arg);
                } else {
                    return Err(format!("Unexpected argument. {}", usage(&prog)));
                }
            }
        }
    }
    Ok(ParsedArgs {
        url: url.unwrap_or_else(|| DEFAULT_URL.to_string()),
        logs,
        once,
    })
}

/// Validate the agent address. Only plain `ws://` is supported: TLS is
/// terminated in front of the agent, and the viewer carries no TLS stack.
pub fn agent_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid url {raw}: {e}"))?;
    match url.scheme() {
        "ws" => Ok(url),
        "wss" => Err(format!("wss:// is not supported, connect with ws:// ({url})")),
        other => Err(format!("expected a ws:// url, got scheme {other:?} ({url})")),
    }
}
