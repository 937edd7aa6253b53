//! Durable crash / event log.
//!
//! One append-only text file, one line per entry:
//!
//! ```text
//! 2026-01-02T03:04:05.678Z: exec 'ping' failed: HTTP 500
//! ```
//!
//! Multi-line messages (panic backtraces) continue on the following lines
//! until the next timestamped line. Writing never fails from the caller's
//! point of view: I/O errors are reported through `tracing` and dropped.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::panic::PanicHookInfo;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;

/// Returned by [`CrashLog::read`] when there is nothing to show.
pub const NO_LOGS: &str = "📭 No crash logs";

const LOG_FILE_NAME: &str = "crash_log.txt";

/// Serializes appends within this process; `O_APPEND` covers other processes.
static APPEND_LOCK: Mutex<()> = Mutex::new(());

static HOOK_INSTALLED: OnceLock<PathBuf> = OnceLock::new();

/// A single parsed log record.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Handle to the on-disk log. Cheap to clone; holds only the path.
#[derive(Debug, Clone)]
pub struct CrashLog {
    path: PathBuf,
}

impl CrashLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_local_dir>/payload-debug/crash_log.txt`, or the temp dir when
    /// the platform has no per-user data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("payload-debug")
            .join(LOG_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `message` with the current UTC timestamp. Best effort.
    pub fn record(&self, message: impl AsRef<str>) {
        if let Err(e) = self.append(Utc::now(), message.as_ref()) {
            warn!(path = %self.path.display(), error = %e, "Failed to write crash log");
        }
    }

    fn append(&self, at: DateTime<Utc>, message: &str) -> io::Result<()> {
        let line = format_line(at, message);
        let _guard = APPEND_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        // Single write so concurrent appends never interleave mid-line.
        file.write_all(line.as_bytes())
    }

    /// Full log content, or [`NO_LOGS`] when the log is missing or empty.
    pub fn read(&self) -> String {
        match fs::read_to_string(&self.path) {
            Ok(content) if !content.trim().is_empty() => content,
            Ok(_) => NO_LOGS.to_string(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => NO_LOGS.to_string(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read crash log");
                format!("⚠️ Unable to read crash log {}: {e}", self.path.display())
            }
        }
    }

    /// Parse the log back into entries. Unreadable logs yield no entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        fs::read_to_string(&self.path)
            .map(|content| parse_entries(&content))
            .unwrap_or_default()
    }

    /// Truncate the log to empty. Idempotent; a missing log stays missing.
    pub fn clear(&self) {
        let _guard = APPEND_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        match OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
        {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to clear crash log");
            }
        }
    }
}

impl Default for CrashLog {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

fn format_line(at: DateTime<Utc>, message: &str) -> String {
    format!(
        "{}: {}\n",
        at.to_rfc3339_opts(SecondsFormat::Millis, true),
        message.trim_end_matches('\n')
    )
}

fn parse_entries(content: &str) -> Vec<LogEntry> {
    let mut entries: Vec<LogEntry> = Vec::new();
    for line in content.lines() {
        let header = line.split_once(": ").and_then(|(ts, msg)| {
            DateTime::parse_from_rfc3339(ts)
                .ok()
                .map(|t| (t.with_timezone(&Utc), msg))
        });
        match (header, entries.last_mut()) {
            (Some((timestamp, msg)), _) => entries.push(LogEntry {
                timestamp,
                message: msg.to_string(),
            }),
            (None, Some(last)) => {
                last.message.push('\n');
                last.message.push_str(line);
            }
            // Leading garbage before the first entry
            (None, None) => {}
        }
    }
    entries
}

/* ---- Process-wide Fault Hook ---- */

/// Install the panic hook that records every panic into `log` before handing
/// off to the previously installed hook (normally the default one, which
/// prints and lets the panic unwind / abort as usual).
///
/// Only the first call installs anything; later calls return `false`.
pub fn install_panic_hook(log: CrashLog) -> bool {
    let mut installed = false;
    HOOK_INSTALLED.get_or_init(|| {
        let path = log.path.clone();
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            log.record(describe_panic(info));
            previous(info);
        }));
        installed = true;
        path
    });
    installed
}

/// Path of the log the panic hook writes to, if installed.
pub fn panic_hook_path() -> Option<&'static Path> {
    HOOK_INSTALLED.get().map(PathBuf::as_path)
}

fn describe_panic(info: &PanicHookInfo<'_>) -> String {
    let payload = info
        .payload()
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "<non-string panic payload>".to_string());
    let location = info
        .location()
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_else(|| "<unknown location>".to_string());
    let thread = std::thread::current();
    let thread_name = thread.name().unwrap_or("<unnamed>");
    let backtrace = std::backtrace::Backtrace::force_capture();

    format!(
        "=== CRASH ===\nthread '{thread_name}' panicked at {location}:\n{payload}\nstack backtrace:\n{backtrace}"
    )
}
