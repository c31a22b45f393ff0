//! # Remote Runner
//!
//! Runs a staged script on a remote Mac over SSH: upload to `/tmp`, invoke
//! the interpreter there, pull back stdout/stderr, then clean up both the
//! remote copy and the local staged file. libssh2 is blocking, so the whole
//! protocol runs on a blocking task.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use ssh2::{KeyboardInteractivePrompt, Prompt, Session};
use tracing::{debug, warn};

use super::{Outcome, StagedScript, local::OSASCRIPT, staging};
use crate::config::RemoteConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(25);

pub async fn run(staged: StagedScript, params: RemoteConfig, timeout_secs: u64) -> Outcome {
    let joined = tokio::task::spawn_blocking(move || {
        let outcome = run_blocking(staged.path(), &params, timeout_secs);
        // Local cleanup happens on every path, including connection failure.
        staged.remove();
        outcome
    })
    .await;

    match joined {
        Ok(outcome) => outcome,
        Err(err) => Outcome::Internal(format!("remote execution task failed: {err}")),
    }
}

fn run_blocking(local_path: &Path, params: &RemoteConfig, timeout_secs: u64) -> Outcome {
    let session = match connect(params) {
        Ok(session) => session,
        Err(err) => {
            return Outcome::ConnectionFailed {
                host: params.host.clone(),
                error: format!("{err:#}"),
            };
        }
    };

    let remote_path = format!("/tmp/{}", staging::unique_name());
    let outcome = match upload(&session, local_path, &remote_path) {
        Ok(()) => {
            let outcome = exec(&session, &remote_path, timeout_secs);
            // Remove the remote copy regardless of how execution went.
            remove_remote(&session, &remote_path);
            outcome
        }
        Err(err) => Outcome::Internal(format!("upload to {remote_path} failed: {err:#}")),
    };

    let _ = session.disconnect(None, "done", None);
    outcome
}

/// Answers keyboard-interactive challenges with the configured password for
/// any prompt that looks like it is asking for one.
struct PasswordPrompt<'a> {
    password: &'a str,
}

impl KeyboardInteractivePrompt for PasswordPrompt<'_> {
    fn prompt<'b>(
        &mut self,
        _username: &str,
        _instructions: &str,
        prompts: &[Prompt<'b>],
    ) -> Vec<String> {
        prompts
            .iter()
            .map(|p| {
                if p.text.to_lowercase().contains("password") {
                    self.password.to_string()
                } else {
                    String::new()
                }
            })
            .collect()
    }
}

fn connect(params: &RemoteConfig) -> Result<Session> {
    let addr = (params.host.as_str(), params.port)
        .to_socket_addrs()
        .with_context(|| format!("cannot resolve {}", params.host))?
        .next()
        .with_context(|| format!("no address found for {}", params.host))?;

    let tcp = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).context("TCP connect failed")?;
    tcp.set_read_timeout(Some(CONNECT_TIMEOUT)).ok();
    tcp.set_write_timeout(Some(CONNECT_TIMEOUT)).ok();

    let mut session = Session::new().context("failed to create SSH session")?;
    session.set_tcp_stream(tcp);
    session.handshake().context("SSH handshake failed")?;

    // Password first; some servers only offer keyboard-interactive, in which
    // case the configured password answers the prompt.
    if session
        .userauth_password(&params.user, &params.password)
        .is_err()
    {
        let mut prompter = PasswordPrompt {
            password: &params.password,
        };
        session
            .userauth_keyboard_interactive(&params.user, &mut prompter)
            .context("SSH authentication failed")?;
    }
    if !session.authenticated() {
        bail!("SSH authentication failed");
    }

    debug!(host = %params.host, user = %params.user, "SSH session established");
    Ok(session)
}

fn upload(session: &Session, local_path: &Path, remote_path: &str) -> Result<()> {
    let bytes = std::fs::read(local_path).context("failed to read staged script")?;
    let sftp = session.sftp().context("failed to open SFTP subsystem")?;
    let mut file = sftp
        .create(Path::new(remote_path))
        .context("failed to create remote file")?;
    file.write_all(&bytes).context("failed to write remote file")?;
    debug!(remote_path, "uploaded script");
    Ok(())
}

/// Execute the interpreter against the uploaded script. The timeout bounds
/// only this step; connection and upload are not separately time-bounded.
fn exec(session: &Session, remote_path: &str, timeout_secs: u64) -> Outcome {
    let mut channel = match session.channel_session() {
        Ok(channel) => channel,
        Err(err) => return Outcome::Internal(err.to_string()),
    };
    if let Err(err) = channel.exec(&format!("{OSASCRIPT} {remote_path}")) {
        return Outcome::Internal(err.to_string());
    }

    session.set_blocking(false);
    let deadline = Instant::now() + Duration::from_secs(timeout_secs);
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut buf = [0u8; 8192];

    loop {
        let mut progress = false;
        match channel.read(&mut buf) {
            Ok(0) => {}
            Ok(n) => {
                stdout.extend_from_slice(&buf[..n]);
                progress = true;
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => {}
            Err(err) => {
                session.set_blocking(true);
                return Outcome::Internal(err.to_string());
            }
        }
        match channel.stderr().read(&mut buf) {
            Ok(0) => {}
            Ok(n) => {
                stderr.extend_from_slice(&buf[..n]);
                progress = true;
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => {}
            Err(err) => {
                session.set_blocking(true);
                return Outcome::Internal(err.to_string());
            }
        }

        if channel.eof() {
            break;
        }
        if Instant::now() >= deadline {
            session.set_blocking(true);
            let _ = channel.close();
            return Outcome::TimedOut(timeout_secs);
        }
        if !progress {
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    session.set_blocking(true);
    let _ = channel.close();
    let _ = channel.wait_close();
    let exit = channel.exit_status().unwrap_or(-1);
    if exit != 0 {
        Outcome::Failed(String::from_utf8_lossy(&stderr).into_owned())
    } else {
        Outcome::Success(String::from_utf8_lossy(&stdout).into_owned())
    }
}

fn remove_remote(session: &Session, remote_path: &str) {
    match session.sftp() {
        Ok(sftp) => {
            if let Err(err) = sftp.unlink(Path::new(remote_path)) {
                warn!(remote_path, error = %err, "failed to delete remote script");
            }
        }
        Err(err) => warn!(remote_path, error = %err, "failed to reopen SFTP for cleanup"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn params(host: &str, port: u16) -> RemoteConfig {
        RemoteConfig {
            host: host.to_string(),
            port,
            user: "automation".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[test]
    fn password_prompt_answers_password_requests_only() {
        let mut prompter = PasswordPrompt { password: "hunter2" };
        let prompts = vec![
            Prompt {
                text: Cow::Borrowed("Password: "),
                echo: false,
            },
            Prompt {
                text: Cow::Borrowed("One-time code: "),
                echo: true,
            },
        ];
        let answers = prompter.prompt("automation", "", &prompts);
        assert_eq!(answers, vec!["hunter2".to_string(), String::new()]);
    }

    #[tokio::test]
    async fn connection_failure_is_reported_and_cleans_up() {
        // A listener that drops connections immediately fails the handshake.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            let _ = listener.accept();
        });

        let staged = StagedScript::write("return 1").unwrap();
        let path = staged.path().to_path_buf();
        let outcome = run(staged, params("127.0.0.1", port), 5).await;
        match outcome {
            Outcome::ConnectionFailed { host, error } => {
                assert_eq!(host, "127.0.0.1");
                assert!(!error.is_empty());
            }
            other => panic!("expected connection failure, got {other:?}"),
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn unresolvable_host_is_a_connection_failure() {
        let staged = StagedScript::write("return 1").unwrap();
        let path = staged.path().to_path_buf();
        let outcome = run(staged, params("host.invalid.", 22), 5).await;
        assert!(matches!(outcome, Outcome::ConnectionFailed { .. }));
        assert!(!path.exists());
    }
}
