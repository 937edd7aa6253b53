/*!
`logs.rs`

`payload-debug logs <show|clear> [--tail N]`

  show  : print the crash/event log (or the "no crash logs" sentinel)
  clear : truncate it; clearing an already-empty log is a no-op

Works offline; no agent call is made.
*/

use anyhow::Result;
use clap::Args;
use std::fmt;
use tracing::debug;

use payload_debug::crashlog::NO_LOGS;

use crate::cmd::format::{Role, color};
use crate::cmd::shared::Shell;

/// What to do with the crash log.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogAction {
    Show,
    Clear,
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogAction::Show => "show",
            LogAction::Clear => "clear",
        })
    }
}

#[derive(Args, Debug)]
pub struct LogsArgs {
    /// show | clear
    pub action: LogAction,

    /// Only the last N entries (show)
    #[arg(long, value_name = "N")]
    pub tail: Option<usize>,
}

pub fn execute_logs(shell: &Shell, args: LogsArgs) -> Result<()> {
    let path = shell.log.path().display().to_string();
    match args.action {
        LogAction::Show => {
            let text = match args.tail {
                Some(n) => tail_entries(shell, n),
                None => shell.log.read(),
            };
            shell.show("log", "Crash log", Some(path), text.trim_end());
        }
        LogAction::Clear => {
            shell.log.clear();
            debug!(action = %args.action, "Crash log cleared");
            shell.show(
                "broom",
                "Crash log",
                Some(path),
                &color(Role::Success, "Crash log cleared", &shell.style),
            );
        }
    }
    Ok(())
}

fn tail_entries(shell: &Shell, n: usize) -> String {
    let entries = shell.log.entries();
    if entries.is_empty() {
        return NO_LOGS.to_string();
    }
    let skip = entries.len().saturating_sub(n);
    entries[skip..]
        .iter()
        .map(|e| {
            format!(
                "{}: {}",
                e.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                e.message
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::format::StyleOptions;
    use clap::Parser;
    use payload_debug::config::ClientConfig;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(subcommand)]
        cmd: TestSub,
    }

    #[derive(clap::Subcommand, Debug)]
    enum TestSub {
        Logs(LogsArgs),
    }

    #[test]
    fn clap_parses_actions() {
        let TestSub::Logs(a) = TestCli::try_parse_from(["t", "logs", "show", "--tail", "3"])
            .unwrap()
            .cmd;
        assert_eq!(a.action, LogAction::Show);
        assert_eq!(a.tail, Some(3));
        let TestSub::Logs(a) = TestCli::try_parse_from(["t", "logs", "clear"]).unwrap().cmd;
        assert_eq!(a.action, LogAction::Clear);
        assert!(TestCli::try_parse_from(["t", "logs", "purge"]).is_err());
    }

    #[test]
    fn action_display() {
        assert_eq!(LogAction::Show.to_string(), "show");
        assert_eq!(LogAction::Clear.to_string(), "clear");
    }

    #[test]
    fn tail_keeps_last_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ClientConfig::default();
        config.crash_log = dir.path().join("crash_log.txt");
        let mut shell = Shell::new(config).unwrap();
        shell.style = StyleOptions::plain();

        assert_eq!(tail_entries(&shell, 2), NO_LOGS);
        for i in 0..4 {
            shell.log.record(format!("event {i}"));
        }
        let tail = tail_entries(&shell, 2);
        assert!(!tail.contains("event 1"));
        assert!(tail.contains("event 2"));
        assert!(tail.ends_with("event 3"));

        execute_logs(
            &shell,
            LogsArgs {
                action: LogAction::Clear,
                tail: None,
            },
        )
        .unwrap();
        assert_eq!(shell.log.read(), NO_LOGS);
    }
}
