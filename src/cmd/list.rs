/*!
`list.rs`

`payload-debug list`

Fetches `GET /payloads` and prints the rendered catalog. The accepted
catalog shapes (names, objects, either wrapped under `payloads`) are handled
by the library renderer; anything else is dumped raw.
*/

use anyhow::{Result, bail};
use clap::Args;
use std::time::Instant;

use crate::cmd::shared::Shell;

#[derive(Args, Debug)]
pub struct ListArgs {}

pub async fn execute_list(shell: &Shell, _args: ListArgs) -> Result<()> {
    let started = Instant::now();
    let catalog = shell.client.list_payloads().await;
    let elapsed = started.elapsed().as_millis();

    shell.show(
        "list",
        "Payloads",
        Some(format!("{} • {elapsed} ms", shell.agent_label())),
        &catalog,
    );
    if shell.record_text("list payloads", &catalog) {
        bail!("listing payloads failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(subcommand)]
        cmd: TestSub,
    }

    #[derive(clap::Subcommand, Debug)]
    enum TestSub {
        List(ListArgs),
    }

    #[test]
    fn clap_parses_list() {
        assert!(TestCli::try_parse_from(["t", "list"]).is_ok());
        assert!(TestCli::try_parse_from(["t", "list", "extra"]).is_err());
    }
}
