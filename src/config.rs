//! # Configuration
//!
//! Startup flags for the server. Every remote flag can also come from the
//! environment, which is how MCP hosts usually pass settings to stdio servers.

use clap::Parser;

/// Hosts equal to this sentinel are treated as "this machine": scripts run
/// through the local interpreter and no SSH session is ever opened.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

#[derive(Debug, Parser)]
#[command(
    name = "applescript-mcp",
    about = "MCP server exposing AppleScript execution, locally or over SSH"
)]
pub struct Cli {
    /// Host to run AppleScript on. The loopback default keeps execution local.
    #[arg(long, env = "REMOTE_HOST", default_value = LOOPBACK_HOST)]
    pub remote_host: String,

    /// SSH username for remote execution.
    #[arg(long, env = "REMOTE_USER", default_value = "")]
    pub remote_user: String,

    /// SSH password for remote execution.
    #[arg(long, env = "REMOTE_PASSWORD", default_value = "")]
    pub remote_password: String,

    /// SSH port on the remote host.
    #[arg(long, env = "REMOTE_PORT", default_value_t = 22)]
    pub remote_port: u16,

    /// Log verbosity: error, warn, info or debug. RUST_LOG overrides this.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Remote connection parameters, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl RemoteConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            host: cli.remote_host.clone(),
            port: cli.remote_port,
            user: cli.remote_user.clone(),
            password: cli.remote_password.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_loopback() {
        let cli = Cli::parse_from(["applescript-mcp"]);
        let config = RemoteConfig::from_cli(&cli);
        assert_eq!(config.host, LOOPBACK_HOST);
        assert_eq!(config.port, 22);
        assert!(config.user.is_empty());
        assert!(config.password.is_empty());
    }

    #[test]
    fn remote_flags_are_carried_through() {
        let cli = Cli::parse_from([
            "applescript-mcp",
            "--remote-host",
            "mac-mini.local",
            "--remote-user",
            "automation",
            "--remote-password",
            "hunter2",
            "--remote-port",
            "2222",
        ]);
        let config = RemoteConfig::from_cli(&cli);
        assert_eq!(config.host, "mac-mini.local");
        assert_eq!(config.port, 2222);
        assert_eq!(config.user, "automation");
        assert_eq!(config.password, "hunter2");
    }
}
