/*!
`ping.rs`

`payload-debug ping [--list]`

Probes the configured agent (`GET probe_path`). With `--list`, a reachable
agent is followed by the payload catalog, the same sequence the shell runs
when it first connects.

Exit status is non-zero when the agent is unreachable.
*/

use anyhow::{Result, bail};
use clap::Args;
use std::time::Instant;

use crate::cmd::format::{Role, color};
use crate::cmd::shared::Shell;

#[derive(Args, Debug)]
pub struct PingArgs {
    /// Also list payloads when the agent answers
    #[arg(short, long)]
    pub list: bool,
}

pub async fn execute_ping(shell: &Shell, args: PingArgs) -> Result<()> {
    let started = Instant::now();
    let report = shell.client.test_connection().await;
    let elapsed = started.elapsed().as_millis();

    let role = if report.reachable() {
        Role::Success
    } else {
        Role::Error
    };
    shell.show(
        "plug",
        "Connection",
        Some(format!("{} • {elapsed} ms", shell.agent_label())),
        &color(role, &report.message, &shell.style),
    );

    if !report.reachable() {
        shell
            .log
            .record(format!("connection test failed\n{}", report.message));
        bail!("payload agent unreachable ({})", report.state);
    }

    if args.list {
        let catalog = shell.client.list_payloads().await;
        println!();
        shell.show("list", "Payloads", None, &catalog);
        if shell.record_text("list payloads", &catalog) {
            bail!("listing payloads failed");
        }
    }
    Ok(())
}
