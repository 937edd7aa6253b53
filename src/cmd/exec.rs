/*!
`exec.rs`

`payload-debug exec <NAME> [--args TEXT] [--param K=V]... [--param-file PATH] [--async] [--wait]`

Argument sources, highest precedence first:
  --param KEY=VALUE        (repeatable; malformed pairs are an input error)
  --args TEXT              (JSON object or `k=v,k2=v2`; unparseable text
                            degrades to no arguments with a warning)
  --param-file PATH        (JSON / YAML object; only fills missing keys)

Values from `--args` / `--param` are coerced: integer, float, true/false,
otherwise string.

Modes:
  default : synchronous execution, result printed
  --async : agent may answer with a job id; printed with a status hint
  --wait  : implies --async; polls the job every poll_interval until it
            leaves queued/pending/running or max_polls is reached

Every non-completed outcome is appended to the crash log.
*/

use anyhow::Result;
use clap::Args;
use serde_json::{Map, Value};
use std::time::Instant;
use tracing::{debug, warn};

use payload_debug::agent::{ExecMode, Execution, JobHandle, Outcome, PayloadRequest};
use payload_debug::args::{merge_param_file, merge_params, parse as parse_free_form};

use crate::cmd::format::{Role, color, table};
use crate::cmd::shared::{Shell, finish};

/* -------------------------------------------------------------------------- */
/* Argument Struct                                                            */
/* -------------------------------------------------------------------------- */

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Payload name to execute
    #[arg(value_name = "NAME")]
    pub payload: String,

    /// Free-form arguments: JSON object or k=v,k2=v2
    #[arg(long = "args", value_name = "TEXT")]
    pub args: Option<String>,

    /// Provide parameter (KEY=VALUE), repeatable
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Load parameters from file (JSON or YAML). Other sources override it
    #[arg(long = "param-file", value_name = "PATH")]
    pub param_file: Option<String>,

    /// Ask the agent to run the payload as a background job
    #[arg(long = "async")]
    pub async_mode: bool,

    /// Run async and poll the job until it finishes
    #[arg(long)]
    pub wait: bool,
}

impl ExecArgs {
    fn mode(&self) -> ExecMode {
        if self.async_mode || self.wait {
            ExecMode::Async
        } else {
            ExecMode::Sync
        }
    }
}

/// Merged argument mapping plus the free-form parser's warning, if any.
#[derive(Debug)]
struct CollectedArgs {
    values: Map<String, Value>,
    warning: Option<String>,
}

fn collect_arguments(args: &ExecArgs) -> Result<CollectedArgs> {
    let parsed = parse_free_form(args.args.as_deref().unwrap_or(""));
    let mut values = parsed.values;
    merge_params(&mut values, &args.params)?;
    if let Some(path) = &args.param_file {
        merge_param_file(&mut values, path)?;
    }
    Ok(CollectedArgs {
        values,
        warning: parsed.warning,
    })
}

/* -------------------------------------------------------------------------- */
/* Public Entry Point                                                         */
/* -------------------------------------------------------------------------- */

pub async fn execute_exec(shell: &Shell, args: ExecArgs) -> Result<()> {
    let name = args.payload.trim().to_string();
    if name.is_empty() {
        return shell.reject("exec", "⚠️ Enter a payload name");
    }

    let collected = match collect_arguments(&args) {
        Ok(c) => c,
        Err(e) => return shell.reject("exec", &format!("{e:#}")),
    };
    if let Some(w) = &collected.warning {
        warn!(payload = %name, "{w}");
        shell.warn(w);
    }

    let request = match PayloadRequest::new(&name, collected.values) {
        Ok(r) => r.with_mode(args.mode()),
        Err(e) => return shell.reject("exec", &e.to_string()),
    };
    debug!(payload = request.name(), mode = ?request.mode, "Dispatching");

    print_arguments(shell, &request);

    let started = Instant::now();
    let execution = shell.client.execute(&request).await;
    let elapsed = started.elapsed().as_millis();

    shell.show(
        "rocket",
        format!("Executing payload: {name}"),
        Some(format!("{} • {elapsed} ms", shell.agent_label())),
        &execution.text,
    );
    shell.record(&format!("exec '{name}'"), &execution);

    if execution.outcome == (Outcome::Failed { http_status: 404 })
        && let Some(names) = shell.client.payload_names().await
        && let Some(hint) = name_hint(&name, &names)
    {
        shell.note(hint);
    }

    let Some(job) = execution.job.clone() else {
        if request.mode.is_async() && execution.outcome.is_completed() {
            shell.note("Agent returned no job id; the result above is final.");
        }
        return finish(&execution.outcome);
    };

    if !args.wait {
        shell.note(format!("Check progress with: payload-debug status {job}"));
        return finish(&execution.outcome);
    }

    let last = wait(shell, &job).await;
    finish(&last.outcome)
}

/* -------------------------------------------------------------------------- */
/* Helpers                                                                    */
/* -------------------------------------------------------------------------- */

fn print_arguments(shell: &Shell, request: &PayloadRequest) {
    if request.arguments.is_empty() {
        return;
    }
    let rows: Vec<Vec<String>> = request
        .arguments
        .iter()
        .map(|(k, v)| {
            let shown = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            vec![k.clone(), shown]
        })
        .collect();
    println!("{}", table(&["ARG", "VALUE"], &rows, &shell.style));
    println!();
}

/// Names the agent does know, shown after an unknown-payload 404. Names
/// sharing a case-insensitive substring with `name` come first.
fn name_hint(name: &str, names: &[String]) -> Option<String> {
    const SHOWN: usize = 8;
    if names.is_empty() || names.iter().any(|n| n == name) {
        return None;
    }
    let needle = name.to_ascii_lowercase();
    let (mut close, rest): (Vec<&String>, Vec<&String>) = names.iter().partition(|n| {
        let n = n.to_ascii_lowercase();
        n.contains(&needle) || needle.contains(&n)
    });
    close.extend(rest);
    let mut shown: Vec<&str> = close.iter().take(SHOWN).map(|n| n.as_str()).collect();
    if names.len() > SHOWN {
        shown.push("…");
    }
    Some(format!("Known payloads: {}", shown.join(", ")))
}

async fn wait(shell: &Shell, job: &JobHandle) -> Execution {
    let max_polls = shell.client.config().max_polls.max(1);
    let last = shell
        .client
        .wait_for_job(job, |poll, update| {
            let state = update.job_status.as_deref().unwrap_or("unknown");
            println!(
                "{}",
                color(
                    Role::Dim,
                    format!("  poll {poll}/{max_polls}: {state}"),
                    &shell.style
                )
            );
        })
        .await;

    println!();
    shell.show(
        "clock",
        format!("Job {job}"),
        last.job_status.clone(),
        &last.text,
    );
    shell.record(&format!("status '{job}'"), &last);
    if last.is_pending() {
        shell.note(format!(
            "Job still pending after {max_polls} polls; check later with: payload-debug status {job}"
        ));
    }
    last
}

/* -------------------------------------------------------------------------- */
/* Tests                                                                      */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(subcommand)]
        cmd: TestSub,
    }

    #[derive(clap::Subcommand, Debug)]
    enum TestSub {
        Exec(ExecArgs),
    }

    fn parse(argv: &[&str]) -> ExecArgs {
        let mut full = vec!["t", "exec"];
        full.extend_from_slice(argv);
        let TestSub::Exec(a) = TestCli::try_parse_from(full).unwrap().cmd;
        a
    }

    #[test]
    fn clap_parses_exec_flags() {
        let a = parse(&[
            "port_scan",
            "--args",
            "host=10.0.0.1,ports=22",
            "--param",
            "timeout=5",
            "--async",
        ]);
        assert_eq!(a.payload, "port_scan");
        assert_eq!(a.args.as_deref(), Some("host=10.0.0.1,ports=22"));
        assert_eq!(a.params, vec!["timeout=5"]);
        assert!(a.async_mode);
        assert_eq!(a.mode(), ExecMode::Async);
    }

    #[test]
    fn wait_implies_async() {
        let a = parse(&["ping", "--wait"]);
        assert!(!a.async_mode);
        assert_eq!(a.mode(), ExecMode::Async);
        assert_eq!(parse(&["ping"]).mode(), ExecMode::Sync);
    }

    #[test]
    fn params_override_args_text() {
        let a = parse(&["p", "--args", "a=1,b=2", "--param", "b=x"]);
        let c = collect_arguments(&a).unwrap();
        assert_eq!(c.values.get("a"), Some(&json!(1)));
        assert_eq!(c.values.get("b"), Some(&json!("x")));
        assert!(c.warning.is_none());
    }

    #[test]
    fn bad_json_degrades_with_warning() {
        let a = parse(&["p", "--args", "{not json"]);
        let c = collect_arguments(&a).unwrap();
        assert!(c.values.is_empty());
        assert!(c.warning.is_some());
    }

    #[test]
    fn param_file_fills_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.yaml");
        std::fs::write(&path, "a: 10\nc: hello\n").unwrap();
        let a = parse(&[
            "p",
            "--args",
            "a=1",
            "--param-file",
            path.to_str().unwrap(),
        ]);
        let c = collect_arguments(&a).unwrap();
        assert_eq!(c.values.get("a"), Some(&json!(1)));
        assert_eq!(c.values.get("c"), Some(&json!("hello")));
    }

    #[test]
    fn hint_lists_similar_names_first() {
        let names: Vec<String> = ["ping", "port_scan", "echo"].map(String::from).into();
        assert_eq!(
            name_hint("scan", &names).as_deref(),
            Some("Known payloads: port_scan, ping, echo")
        );
        assert_eq!(name_hint("ping", &names), None);
        assert_eq!(name_hint("x", &[]), None);
    }

    #[test]
    fn hint_is_capped() {
        let names: Vec<String> = (0..12).map(|i| format!("p{i}")).collect();
        let hint = name_hint("zzz", &names).unwrap();
        assert!(hint.ends_with("p7, …"), "{hint}");
    }

    #[test]
    fn malformed_param_is_an_error() {
        let a = parse(&["p", "--param", "novalue"]);
        assert!(collect_arguments(&a).is_err());
    }
}
