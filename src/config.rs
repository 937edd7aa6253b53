//! Client configuration.
//!
//! Layering (lowest to highest precedence):
//!   1. built-in defaults (agent on `http://127.0.0.1:8000`)
//!   2. optional config file (`--config`, YAML or JSON)
//!   3. environment variables (`PAYLOAD_*`)
//!   4. CLI flags (applied by the binary through the setters below)

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::agent::parse_endpoint;
use crate::crashlog::CrashLog;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Request body schema understood by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireSchema {
    /// `{name, args, async, timestamp}`
    #[default]
    Canonical,
    /// `{payload, args}`
    Legacy,
}

impl FromStr for WireSchema {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "canonical" => Ok(Self::Canonical),
            "legacy" => Ok(Self::Legacy),
            other => anyhow::bail!("unknown wire schema '{other}' (expected canonical|legacy)"),
        }
    }
}

/// Effective client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Agent base address.
    pub base_url: Url,

    /// TCP connect timeout. The agent is co-located, so this stays short.
    pub connect_timeout: Duration,

    /// Per-read timeout; long enough to cover payload execution.
    pub read_timeout: Duration,

    /// Upload allowance, folded into the per-request deadline.
    pub write_timeout: Duration,

    /// Liveness probe path (`/` or `/docs`).
    pub probe_path: String,

    pub wire_schema: WireSchema,

    /// Crash / event log location.
    pub crash_log: PathBuf,

    /// Delay between status polls for `exec --wait`.
    pub poll_interval: Duration,

    /// Upper bound on status polls for `exec --wait`.
    pub max_polls: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            // Constant input; pinned by the `defaults` test.
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(10),
            probe_path: "/".into(),
            wire_schema: WireSchema::Canonical,
            crash_log: CrashLog::default_path(),
            poll_interval: Duration::from_secs(2),
            max_polls: 30,
        }
    }
}

/// On-disk configuration file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub base_url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub connect_timeout_seconds: Option<u64>,
    pub read_timeout_seconds: Option<u64>,
    pub write_timeout_seconds: Option<u64>,
    pub probe_path: Option<String>,
    pub wire_schema: Option<WireSchema>,
    pub crash_log: Option<PathBuf>,
    pub poll_interval_seconds: Option<u64>,
    pub max_polls: Option<u32>,
}

impl ConfigFile {
    /// Read a YAML (`.yaml` / `.yml`) or JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
        if is_yaml {
            serde_yaml::from_str(&raw)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))
        } else {
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))
        }
    }
}

impl ClientConfig {
    /// Defaults, then `file` (if any), then the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = file {
            config.apply_file(ConfigFile::load(path)?)?;
            debug!(path = %path.display(), "Loaded config file");
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_file(&mut self, file: ConfigFile) -> Result<()> {
        if let Some(url) = file.base_url {
            self.set_base_url(&url)?;
        }
        if let Some(host) = file.host {
            self.set_host(&host)?;
        }
        if let Some(port) = file.port {
            self.set_port(port)?;
        }
        if let Some(s) = file.connect_timeout_seconds {
            self.connect_timeout = Duration::from_secs(s);
        }
        if let Some(s) = file.read_timeout_seconds {
            self.read_timeout = Duration::from_secs(s);
        }
        if let Some(s) = file.write_timeout_seconds {
            self.write_timeout = Duration::from_secs(s);
        }
        if let Some(p) = file.probe_path {
            self.probe_path = p;
        }
        if let Some(w) = file.wire_schema {
            self.wire_schema = w;
        }
        if let Some(p) = file.crash_log {
            self.crash_log = p;
        }
        if let Some(s) = file.poll_interval_seconds {
            self.poll_interval = Duration::from_secs(s);
        }
        if let Some(n) = file.max_polls {
            self.max_polls = n;
        }
        Ok(())
    }

    /// Apply `PAYLOAD_*` variables read through `lookup`.
    ///
    /// Addresses must parse (a typo would silently target the wrong agent);
    /// malformed numbers are logged and ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("PAYLOAD_AGENT_URL") {
            self.set_base_url(&url)
                .context("Invalid PAYLOAD_AGENT_URL")?;
        }
        if let Some(host) = get("PAYLOAD_AGENT_HOST") {
            self.set_host(&host).context("Invalid PAYLOAD_AGENT_HOST")?;
        }
        if let Some(port) = get("PAYLOAD_AGENT_PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PAYLOAD_AGENT_PORT: '{port}'"))?;
            self.set_port(port)?;
        }

        let seconds = |key: &str| -> Option<Duration> {
            let raw = get(key)?;
            match raw.trim().parse::<u64>() {
                Ok(s) => Some(Duration::from_secs(s)),
                Err(e) => {
                    warn!(var = key, value = %raw, error = %e, "Ignoring malformed timeout");
                    None
                }
            }
        };
        if let Some(d) = seconds("PAYLOAD_CONNECT_TIMEOUT") {
            self.connect_timeout = d;
        }
        if let Some(d) = seconds("PAYLOAD_READ_TIMEOUT") {
            self.read_timeout = d;
        }
        if let Some(d) = seconds("PAYLOAD_WRITE_TIMEOUT") {
            self.write_timeout = d;
        }
        if let Some(schema) = get("PAYLOAD_WIRE_SCHEMA") {
            self.wire_schema = schema.parse()?;
        }
        if let Some(path) = get("PAYLOAD_CRASH_LOG") {
            self.crash_log = PathBuf::from(path);
        }
        Ok(())
    }

    pub fn set_base_url(&mut self, raw: &str) -> Result<()> {
        self.base_url = parse_endpoint(raw)?;
        Ok(())
    }

    pub fn set_host(&mut self, host: &str) -> Result<()> {
        self.base_url
            .set_host(Some(host.trim()))
            .with_context(|| format!("Invalid agent host: '{host}'"))
    }

    pub fn set_port(&mut self, port: u16) -> Result<()> {
        self.base_url
            .set_port(Some(port))
            .map_err(|_| anyhow::anyhow!("Cannot set port {port} on {}", self.base_url))
    }

    /// Overall deadline for a single request: connect + write + read.
    pub fn request_deadline(&self) -> Duration {
        self.connect_timeout + self.write_timeout + self.read_timeout
    }

    pub fn crash_log(&self) -> CrashLog {
        CrashLog::new(&self.crash_log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let c = ClientConfig::default();
        assert_eq!(c.base_url.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(c.connect_timeout, Duration::from_secs(10));
        assert_eq!(c.read_timeout, Duration::from_secs(60));
        assert_eq!(c.write_timeout, Duration::from_secs(10));
        assert_eq!(c.request_deadline(), Duration::from_secs(80));
        assert_eq!(c.wire_schema, WireSchema::Canonical);
        assert!(c.crash_log.ends_with("crash_log.txt"));
    }

    #[test]
    fn env_overrides() {
        let mut c = ClientConfig::default();
        c.apply_env(env(&[
            ("PAYLOAD_AGENT_HOST", "10.0.0.2"),
            ("PAYLOAD_AGENT_PORT", "9001"),
            ("PAYLOAD_READ_TIMEOUT", "120"),
            ("PAYLOAD_CONNECT_TIMEOUT", "soon"),
            ("PAYLOAD_WIRE_SCHEMA", "Legacy"),
            ("PAYLOAD_CRASH_LOG", "/tmp/x.log"),
        ]))
        .unwrap();
        assert_eq!(c.base_url.as_str(), "http://10.0.0.2:9001/");
        assert_eq!(c.read_timeout, Duration::from_secs(120));
        assert_eq!(c.connect_timeout, Duration::from_secs(10), "malformed ignored");
        assert_eq!(c.wire_schema, WireSchema::Legacy);
        assert_eq!(c.crash_log, PathBuf::from("/tmp/x.log"));
    }

    #[test]
    fn env_url_then_port() {
        let mut c = ClientConfig::default();
        c.apply_env(env(&[
            ("PAYLOAD_AGENT_URL", "localhost:7000"),
            ("PAYLOAD_AGENT_PORT", "7001"),
        ]))
        .unwrap();
        assert_eq!(c.base_url.as_str(), "http://localhost:7001/");
    }

    #[test]
    fn env_bad_url_is_an_error() {
        let mut c = ClientConfig::default();
        let err = c
            .apply_env(env(&[("PAYLOAD_AGENT_URL", "ftp://nope")]))
            .unwrap_err();
        assert!(format!("{err:#}").contains("PAYLOAD_AGENT_URL"));
    }

    #[test]
    fn yaml_file_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.yaml");
        std::fs::write(
            &path,
            "port: 8100\nread_timeout_seconds: 5\nwire_schema: legacy\nprobe_path: /docs\nmax_polls: 3\n",
        )
        .unwrap();

        let mut c = ClientConfig::default();
        c.apply_file(ConfigFile::load(&path).unwrap()).unwrap();
        assert_eq!(c.base_url.port(), Some(8100));
        assert_eq!(c.read_timeout, Duration::from_secs(5));
        assert_eq!(c.wire_schema, WireSchema::Legacy);
        assert_eq!(c.probe_path, "/docs");
        assert_eq!(c.max_polls, 3);
    }

    #[test]
    fn json_file_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.json");
        std::fs::write(&path, r#"{"base_url":"http://h:1","colour":"blue"}"#).unwrap();
        assert!(ConfigFile::load(&path).is_err());
    }

    #[test]
    fn wire_schema_from_str() {
        assert_eq!("canonical".parse::<WireSchema>().unwrap(), WireSchema::Canonical);
        assert!("v3".parse::<WireSchema>().is_err());
    }
}
