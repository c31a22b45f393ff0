//! # Script Execution Dispatcher
//!
//! One entry point for the tool layer: stage the script, decide local vs
//! remote, run it, and flatten the typed outcome into the single text
//! channel the protocol expects. Failures never become protocol errors;
//! they come back as descriptive text, same as the output they replace.

pub mod local;
pub mod remote;
pub mod staging;

pub use staging::StagedScript;

use tracing::debug;

use crate::config::{LOOPBACK_HOST, RemoteConfig};

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Where a script will run. Resolved fresh on every call rather than cached,
/// so a future configuration reload keeps working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionTarget {
    Local,
    Remote(RemoteConfig),
}

impl ExecutionTarget {
    /// Remote execution requires all three parameters populated and a host
    /// that is not the loopback sentinel. Anything less falls back to local.
    pub fn resolve(config: &RemoteConfig) -> Self {
        let remote = !config.host.is_empty()
            && config.host != LOOPBACK_HOST
            && !config.user.is_empty()
            && !config.password.is_empty();
        if remote {
            Self::Remote(config.clone())
        } else {
            Self::Local
        }
    }
}

/// Every way a script run can end.
#[derive(Debug)]
pub enum Outcome {
    /// Interpreter exited zero; carries its stdout, unmodified.
    Success(String),
    /// Interpreter exited non-zero; carries its stderr.
    Failed(String),
    /// Process killed after the wall-clock timeout; no partial output.
    TimedOut(u64),
    /// SSH session could not be established.
    ConnectionFailed { host: String, error: String },
    /// Anything else that went wrong along the way.
    Internal(String),
}

impl Outcome {
    /// Flatten into the one text channel. These formats are load-bearing:
    /// existing callers match on them.
    pub fn into_text(self) -> String {
        match self {
            Outcome::Success(stdout) => stdout,
            Outcome::Failed(stderr) => format!("AppleScript execution failed: {stderr}"),
            Outcome::TimedOut(secs) => {
                format!("AppleScript execution timed out after {secs} seconds")
            }
            Outcome::ConnectionFailed { host, error } => {
                format!("SSH connection to {host} failed: {error}")
            }
            Outcome::Internal(err) => format!("Error executing AppleScript: {err}"),
        }
    }
}

/// Stage and run a script against the resolved target.
pub async fn run_script(script: &str, timeout_secs: u64, config: &RemoteConfig) -> Outcome {
    let staged = match StagedScript::write(script) {
        Ok(staged) => staged,
        Err(err) => return Outcome::Internal(format!("{err:#}")),
    };
    match ExecutionTarget::resolve(config) {
        ExecutionTarget::Local => {
            debug!(timeout_secs, "running script locally");
            local::LocalRunner::default().run(staged, timeout_secs).await
        }
        ExecutionTarget::Remote(params) => {
            debug!(timeout_secs, host = %params.host, "running script remotely");
            remote::run(staged, params, timeout_secs).await
        }
    }
}
