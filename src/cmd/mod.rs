/*!
Subcommand modules for the `payload-debug` binary.

Kept minimal: module declarations and re-exports only.

Directory Layout:
  src/cmd/
    mod.rs          (this file)
    shared.rs       (Shell: client + crash log + style; outcome helpers)
    format.rs       (box header / color / emoji / table)
    ping.rs         (PingArgs   + execute_ping)
    list.rs         (ListArgs   + execute_list)
    info.rs         (InfoArgs   + execute_info)
    exec.rs         (ExecArgs   + execute_exec)
    status.rs       (StatusArgs + execute_status)
    logs.rs         (LogsArgs   + execute_logs, LogAction)

Conventions:
  - Each subcommand module exposes exactly one public `execute_*` function
    that returns `anyhow::Result<()>`; a failed agent call maps to `Err`
    after its text has been printed.
  - Argument structs derive `clap::Args` and are kept minimal.
*/

pub mod exec;
pub mod format;
pub mod info;
pub mod list;
pub mod logs;
pub mod ping;
pub mod shared;
pub mod status;

pub use exec::{ExecArgs, execute_exec};
pub use info::{InfoArgs, execute_info};
pub use list::{ListArgs, execute_list};
pub use logs::{LogsArgs, execute_logs};
pub use ping::{PingArgs, execute_ping};
pub use shared::Shell;
pub use status::{StatusArgs, execute_status};
