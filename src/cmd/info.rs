/*!
`info.rs`

`payload-debug info <NAME>`

Fetches `GET /payloads/info/{name}` and prints name, description, author,
version and the parameter list. A blank name is refused locally.
*/

use anyhow::{Result, bail};
use clap::Args;

use crate::cmd::shared::Shell;

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Payload to describe
    #[arg(value_name = "NAME")]
    pub name: String,
}

pub async fn execute_info(shell: &Shell, args: InfoArgs) -> Result<()> {
    let name = args.name.trim();
    if name.is_empty() {
        return shell.reject("info", "⚠️ Enter a payload name");
    }

    let text = shell.client.get_payload_info(name).await;
    shell.show("book", format!("Payload: {name}"), Some(shell.agent_label()), &text);
    if shell.record_text(&format!("info '{name}'"), &text) {
        bail!("fetching payload info failed");
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
        Info(InfoArgs),
    }

    #[test]
    fn clap_requires_name() {
        assert!(TestCli::try_parse_from(["t", "info"]).is_err());
        let TestSub::Info(a) = TestCli::try_parse_from(["t", "info", "port_scan"]).unwrap().cmd;
        assert_eq!(a.name, "port_scan");
    }
}
