/*!
Shared runtime pieces for the subcommands.

  - Shell         : client + crash log + style, built once in main.rs
  - Shell::show   : boxed header followed by the agent text
  - Shell::record : write a non-completed outcome into the crash log
  - Shell::record_text : same, for text-only results (❌ prefix)
  - Shell::reject : input error box (no network call was made)
  - finish        : map an Outcome onto the process result
*/

use anyhow::{Context, Result, bail};
use tracing::debug;

use payload_debug::agent::{Execution, Outcome, PayloadClient};
use payload_debug::config::ClientConfig;
use payload_debug::crashlog::CrashLog;

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji};

pub struct Shell {
    pub client: PayloadClient,
    pub log: CrashLog,
    pub style: StyleOptions,
}

impl Shell {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let log = config.crash_log();
        let client = PayloadClient::new(config).context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            log,
            style: StyleOptions::detect(),
        })
    }

    /// "host:port" of the configured agent, for header subtitles.
    pub fn agent_label(&self) -> String {
        let url = &self.client.config().base_url;
        match (url.host_str(), url.port_or_known_default()) {
            (Some(h), Some(p)) => format!("{h}:{p}"),
            _ => url.to_string(),
        }
    }

    pub fn show(&self, tag: &str, title: impl AsRef<str>, subtitle: Option<String>, text: &str) {
        let title = format!("{} {}", emoji(tag, &self.style), title.as_ref());
        println!("{}", box_header(title.trim_start(), subtitle, &self.style));
        println!("{text}");
    }

    pub fn note(&self, text: impl AsRef<str>) {
        println!(
            "{} {}",
            emoji("info", &self.style),
            color(Role::Dim, text, &self.style)
        );
    }

    pub fn warn(&self, text: impl AsRef<str>) {
        eprintln!(
            "{} {}",
            emoji("warn", &self.style),
            color(Role::Warning, text, &self.style)
        );
    }

    /// Every outcome other than `Completed` is a notable event.
    pub fn record(&self, action: &str, execution: &Execution) {
        let entry = match execution.outcome {
            Outcome::Completed { .. } => return,
            Outcome::Failed { http_status } => {
                format!("{action} failed (HTTP {http_status})\n{}", execution.text)
            }
            Outcome::TransportFailure => {
                format!("{action} transport failure\n{}", execution.text)
            }
            Outcome::InvalidInput => format!("{action} rejected: {}", execution.text),
        };
        debug!(action, "recording outcome");
        self.log.record(entry);
    }

    /// For operations that only yield text (list / info): failure texts carry
    /// the ❌ marker. Returns whether the text was a failure.
    pub fn record_text(&self, action: &str, text: &str) -> bool {
        let failed = text.starts_with('❌');
        if failed {
            self.log.record(format!("{action} failed\n{text}"));
        }
        failed
    }

    /// Input problems are reported before anything is dispatched.
    pub fn reject(&self, action: &str, msg: &str) -> Result<()> {
        let title = format!("{} {action} error", emoji("error", &self.style));
        let subtitle = color(Role::Error, msg, &self.style);
        println!("{}", box_header(title.trim_start(), Some(subtitle), &self.style));
        self.log.record(format!("{action} rejected: {msg}"));
        bail!("{msg}")
    }
}

pub fn finish(outcome: &Outcome) -> Result<()> {
    match outcome {
        Outcome::Completed { .. } => Ok(()),
        Outcome::Failed { http_status } => bail!("agent answered with HTTP {http_status}"),
        Outcome::TransportFailure => bail!("payload agent unreachable"),
        Outcome::InvalidInput => bail!("invalid input"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_maps_outcomes() {
        assert!(finish(&Outcome::Completed { http_status: 200 }).is_ok());
        let err = finish(&Outcome::Failed { http_status: 503 }).unwrap_err();
        assert!(err.to_string().contains("503"));
        assert!(finish(&Outcome::TransportFailure).is_err());
        assert!(finish(&Outcome::InvalidInput).is_err());
    }

    fn shell_at(dir: &std::path::Path) -> Shell {
        let mut config = ClientConfig::default();
        config.crash_log = dir.join("crash_log.txt");
        let mut shell = Shell::new(config).unwrap();
        shell.style = StyleOptions::plain();
        shell
    }

    #[test]
    fn record_skips_completed() {
        let dir = tempfile::tempdir().unwrap();
        let shell = shell_at(dir.path());

        let completed = Execution {
            text: "✅ Success".into(),
            outcome: Outcome::Completed { http_status: 200 },
            job: None,
            job_status: None,
        };
        shell.record("exec 'ping'", &completed);
        assert!(shell.log.entries().is_empty());

        let failed = Execution {
            text: "❌ Error (HTTP 404)".into(),
            outcome: Outcome::Failed { http_status: 404 },
            ..completed
        };
        shell.record("exec 'nope'", &failed);
        let entries = shell.log.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].message.contains("exec 'nope' failed (HTTP 404)"));
    }

    #[test]
    fn record_text_only_failures() {
        let dir = tempfile::tempdir().unwrap();
        let shell = shell_at(dir.path());
        assert!(!shell.record_text("list payloads", "📦 Available Payloads (0):\n\n(none)"));
        assert!(shell.log.entries().is_empty());
        assert!(shell.record_text("list payloads", "❌ Failed to list payloads: refused"));
        assert_eq!(shell.log.entries().len(), 1);
    }

    #[test]
    fn reject_logs_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let shell = shell_at(dir.path());
        let err = shell.reject("exec", "⚠️ Enter a payload name").unwrap_err();
        assert!(err.to_string().contains("Enter a payload name"));
        assert!(shell.log.read().contains("exec rejected"));
    }

    #[test]
    fn agent_label_uses_host_and_port() {
        let dir = tempfile::tempdir().unwrap();
        let shell = shell_at(dir.path());
        assert_eq!(shell.agent_label(), "127.0.0.1:8000");
    }
}
