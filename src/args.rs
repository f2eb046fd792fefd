use crate::session::SessionConfig;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Serve DAP over TCP on this address (e.g. 127.0.0.1:4711) instead of stdin/stdout.
    #[clap(long)]
    pub listen: Option<String>,

    /// Exit after the first debug session ends (TCP mode only).
    #[clap(long)]
    pub oneshot: bool,

    /// Optional log file for adapter diagnostics (no output to stdout).
    #[clap(long)]
    pub log_file: Option<PathBuf>,

    /// Trace DAP traffic (requests/responses/events) into the log file.
    /// Requires --log-file.
    #[clap(long)]
    pub trace_dap: bool,

    /// Time to wait for the answer of a single engine evaluation.
    #[clap(long, env = "TORQUE_DAP_EVAL_TIMEOUT_MS", default_value_t = 2000)]
    pub eval_timeout_ms: u64,

    /// Time allowed to connect to the engine and pass the password check.
    #[clap(long, env = "TORQUE_DAP_CONNECT_TIMEOUT_MS", default_value_t = 5000)]
    pub connect_timeout_ms: u64,
}

impl Args {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            eval_timeout: Duration::from_millis(self.eval_timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }
}
