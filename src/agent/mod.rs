//! Payload agent access.
//!
//! parse_endpoint -> Url (http/https only; bare `host:port` gets `http://`)
//! PayloadClient  -> probe / list / execute / status / info
//! dispatch       -> callback adapters over the async operations
//!
//! Every public client operation resolves to operator-facing text. Transport
//! errors are converted at the call boundary and never reach the caller.

pub mod client;
pub mod dispatch;
pub mod wire;

pub use client::{ConnectionReport, Execution, Outcome, PayloadClient};
pub use wire::{ExecMode, JobHandle, PayloadRequest};

use std::fmt;

use url::Url;

use crate::error::ClientError;

/// Reachability as seen by the most recent probe. Never cached by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Unknown,
    Reachable,
    Unreachable,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Unknown => "unknown",
            ConnectionState::Reachable => "reachable",
            ConnectionState::Unreachable => "unreachable",
        };
        f.write_str(s)
    }
}

/// Parse a user-supplied agent base address.
///
/// Parsing Strategy:
/// 1. No `://` present -> assume `http://` (`127.0.0.1:8000`, `localhost:9000`).
/// 2. Parse as URL; only `http` / `https` with a host are accepted.
/// 3. Query / fragment are dropped; the path is kept as a mount prefix.
///
/// Examples:
/// - "http://127.0.0.1:8000"      -> as-is
/// - "localhost:8000"             -> http://localhost:8000/
/// - "https://dev.box/agent/"     -> endpoints under /agent/
pub fn parse_endpoint(raw: &str) -> Result<Url, ClientError> {
    let trimmed = raw.trim();
    let invalid = |reason: &str| ClientError::InvalidEndpoint {
        endpoint: raw.to_string(),
        reason: reason.to_string(),
    };
    if trimmed.is_empty() {
        return Err(invalid("endpoint is empty"));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let mut url = Url::parse(&candidate).map_err(|e| invalid(&e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(&format!("unsupported scheme '{other}'"))),
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Join path segments onto the base URL, percent-encoding each segment.
///
/// `segments` are pushed verbatim, so a job id like `a/b` stays one segment.
pub(crate) fn endpoint_url(base: &Url, segments: &[&str]) -> Result<Url, ClientError> {
    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| ClientError::InvalidEndpoint {
                endpoint: base.to_string(),
                reason: "URL cannot be a base".into(),
            })?;
        path.pop_if_empty();
        path.extend(segments);
    }
    Ok(url)
}

/// `host:port` of the agent, for operator-facing hints.
pub fn host_port(url: &Url) -> String {
    let host = url.host_str().unwrap_or("127.0.0.1");
    match url.port_or_known_default() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_url() {
        let url = parse_endpoint("http://127.0.0.1:8000").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(host_port(&url), "127.0.0.1:8000");
    }

    #[test]
    fn parse_bare_host_port() {
        let url = parse_endpoint("localhost:9000").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.port(), Some(9000));

        let url = parse_endpoint(" 10.0.0.5:8000 ").unwrap();
        assert_eq!(url.host_str(), Some("10.0.0.5"));
    }

    #[test]
    fn reject_bad_endpoints() {
        assert!(parse_endpoint("   ").is_err());
        let err = parse_endpoint("ftp://example.com").unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
        assert!(parse_endpoint("http://").is_err());
    }

    #[test]
    fn query_and_fragment_dropped() {
        let url = parse_endpoint("http://h:1/base?x=1#frag").unwrap();
        assert_eq!(url.as_str(), "http://h:1/base");
    }

    #[test]
    fn endpoint_segments_are_encoded() {
        let base = parse_endpoint("http://127.0.0.1:8000").unwrap();
        let url = endpoint_url(&base, &["payloads", "status", "job 42/x"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8000/payloads/status/job%2042%2Fx"
        );
    }

    #[test]
    fn endpoint_keeps_mount_prefix() {
        let base = parse_endpoint("https://dev.box/agent/").unwrap();
        let url = endpoint_url(&base, &["payloads"]).unwrap();
        assert_eq!(url.as_str(), "https://dev.box/agent/payloads");
        assert_eq!(host_port(&base), "dev.box:443");
    }

    #[test]
    fn root_probe_path() {
        let base = parse_endpoint("http://127.0.0.1:8000").unwrap();
        let url = endpoint_url(&base, &[]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/");
    }

    #[test]
    fn connection_state_display() {
        assert_eq!(ConnectionState::default().to_string(), "unknown");
        assert_eq!(ConnectionState::Unreachable.to_string(), "unreachable");
    }
}
