use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use payload_debug::config::ClientConfig;
use payload_debug::{crashlog, utils};

mod cmd;

use cmd::{ExecArgs, InfoArgs, ListArgs, LogsArgs, PingArgs, Shell, StatusArgs};

/// payload-debug - operator console for a payload agent over HTTP
///
/// Command layout:
///   payload-debug ping   [--list]
///   payload-debug list
///   payload-debug info   <NAME>
///   payload-debug exec   <NAME> [--args TEXT] [--param K=V]... [--param-file PATH] [--async] [--wait]
///   payload-debug status <JOB_ID>
///   payload-debug logs   <show|clear> [--tail N]
///
/// Global flags / env (later wins):
///   defaults < --config FILE < PAYLOAD_* env < -t / --host / --port / --crash-log
///   PAYLOAD_AGENT_URL, PAYLOAD_AGENT_HOST, PAYLOAD_AGENT_PORT
///   PAYLOAD_CONNECT_TIMEOUT, PAYLOAD_READ_TIMEOUT, PAYLOAD_WRITE_TIMEOUT (seconds)
///   PAYLOAD_WIRE_SCHEMA (canonical|legacy), PAYLOAD_CRASH_LOG
///
/// Examples:
///   payload-debug ping --list
///   payload-debug --port 9000 exec port_scan --args "host=10.0.0.5,ports=22-443"
///   payload-debug exec slow_scan --args '{"depth": 3}' --wait
///   payload-debug logs show --tail 20
#[derive(Parser, Debug)]
#[command(
    name = "payload-debug",
    version,
    author,
    about = "payload-debug - test, list, inspect and execute payloads on a payload agent",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Agent base URL (http://host:port); bare host:port is accepted
    #[arg(short = 't', long = "target", global = true, value_name = "URL")]
    target: Option<String>,

    /// Agent host (keeps scheme and port)
    #[arg(long, global = true, value_name = "HOST")]
    host: Option<String>,

    /// Agent port
    #[arg(long, global = true, value_name = "PORT")]
    port: Option<u16>,

    /// Config file (YAML or JSON)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Crash/event log location
    #[arg(long = "crash-log", global = true, value_name = "PATH")]
    crash_log: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Test the connection to the agent
    Ping(PingArgs),

    /// List available payloads
    List(ListArgs),

    /// Show documentation for one payload
    Info(InfoArgs),

    /// Execute a payload
    Exec(ExecArgs),

    /// Check the status of an async job
    Status(StatusArgs),

    /// Show or clear the crash/event log
    Logs(LogsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    let mut config =
        ClientConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // CLI flags are the last layer; a bad endpoint is a usage error
    if let Err(e) = apply_cli_overrides(&mut config, &cli) {
        eprintln!("Invalid agent endpoint: {e:#}");
        std::process::exit(2);
    }

    crashlog::install_panic_hook(config.crash_log());
    debug!(base_url = %config.base_url, crash_log = %config.crash_log.display(), "Configuration resolved");

    let shell = Shell::new(config)?;

    match cli.command {
        Commands::Ping(args) => cmd::execute_ping(&shell, args).await,
        Commands::List(args) => cmd::execute_list(&shell, args).await,
        Commands::Info(args) => cmd::execute_info(&shell, args).await,
        Commands::Exec(args) => cmd::execute_exec(&shell, args).await,
        Commands::Status(args) => cmd::execute_status(&shell, args).await,
        Commands::Logs(args) => cmd::execute_logs(&shell, args),
    }
}

fn apply_cli_overrides(config: &mut ClientConfig, cli: &Cli) -> Result<()> {
    if let Some(target) = &cli.target {
        config.set_base_url(target)?;
    }
    if let Some(host) = &cli.host {
        config.set_host(host)?;
    }
    if let Some(port) = cli.port {
        config.set_port(port)?;
    }
    if let Some(path) = &cli.crash_log {
        config.crash_log = path.clone();
    }
    Ok(())
}
