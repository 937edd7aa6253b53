/*!
`status.rs`

`payload-debug status <JOB_ID>`

One poll of `GET /payloads/status/{job_id}`. Use `exec --wait` to keep
polling until the job settles.
*/

use anyhow::Result;
use clap::Args;

use crate::cmd::shared::{Shell, finish};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Job id returned by an async execution
    #[arg(value_name = "JOB_ID")]
    pub job_id: String,
}

pub async fn execute_status(shell: &Shell, args: StatusArgs) -> Result<()> {
    let job_id = args.job_id.trim();
    if job_id.is_empty() {
        return shell.reject("status", "⚠️ Enter a job id");
    }

    let execution = shell.client.poll_status(job_id).await;
    let subtitle = execution
        .job_status
        .clone()
        .unwrap_or_else(|| shell.agent_label());
    shell.show("clock", format!("Job {job_id}"), Some(subtitle), &execution.text);
    shell.record(&format!("status '{job_id}'"), &execution);
    finish(&execution.outcome)
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
        Status(StatusArgs),
    }

    #[test]
    fn clap_parses_job_id() {
        let TestSub::Status(a) = TestCli::try_parse_from(["t", "status", "job-42"]).unwrap().cmd;
        assert_eq!(a.job_id, "job-42");
    }
}
