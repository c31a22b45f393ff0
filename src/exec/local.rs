//! # Local Runner
//!
//! Invokes the system AppleScript interpreter against a staged file,
//! bounded by a hard wall-clock timeout.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, error};

use super::{Outcome, StagedScript};

/// The system AppleScript interpreter.
pub const OSASCRIPT: &str = "/usr/bin/osascript";

pub struct LocalRunner {
    interpreter: String,
}

impl Default for LocalRunner {
    fn default() -> Self {
        Self {
            interpreter: OSASCRIPT.to_string(),
        }
    }
}

impl LocalRunner {
    /// Substitute interpreter, used by the test suite to run scripts on
    /// machines without osascript.
    #[cfg(test)]
    pub fn with_interpreter(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    /// Run a staged script and classify the outcome. The staged file is
    /// deleted whether the interpreter succeeds, fails or times out.
    pub async fn run(&self, staged: StagedScript, timeout_secs: u64) -> Outcome {
        let outcome = self.run_file(staged.path(), timeout_secs).await;
        staged.remove();
        outcome
    }

    async fn run_file(&self, path: &Path, timeout_secs: u64) -> Outcome {
        let child = Command::new(&self.interpreter)
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on timeout must also kill the process.
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(err) => {
                return Outcome::Internal(format!("failed to spawn {}: {err}", self.interpreter));
            }
        };

        let waited =
            tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await;

        match waited {
            Ok(Ok(output)) if output.status.success() => {
                debug!("interpreter exited cleanly");
                Outcome::Success(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(Ok(output)) => {
                error!(status = %output.status, "interpreter exited non-zero");
                Outcome::Failed(String::from_utf8_lossy(&output.stderr).into_owned())
            }
            Ok(Err(err)) => Outcome::Internal(err.to_string()),
            Err(_) => {
                error!(timeout_secs, "interpreter timed out");
                Outcome::TimedOut(timeout_secs)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(script: &str) -> StagedScript {
        StagedScript::write(script).unwrap()
    }

    #[tokio::test]
    async fn stdout_is_returned_unmodified() {
        let staged = stage("printf 'hello\\nworld\\n'");
        let path = staged.path().to_path_buf();
        let outcome = LocalRunner::with_interpreter("/bin/sh").run(staged, 10).await;
        match outcome {
            Outcome::Success(stdout) => assert_eq!(stdout, "hello\nworld\n"),
            other => panic!("expected success, got {other:?}"),
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn timeout_kills_the_process_and_cleans_up() {
        let staged = stage("sleep 30");
        let path = staged.path().to_path_buf();
        let outcome = LocalRunner::with_interpreter("/bin/sh").run(staged, 1).await;
        match outcome {
            Outcome::TimedOut(secs) => assert_eq!(secs, 1),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let staged = stage("echo 'script blew up' >&2; exit 3");
        let path = staged.path().to_path_buf();
        let outcome = LocalRunner::with_interpreter("/bin/sh").run(staged, 10).await;
        match outcome {
            Outcome::Failed(stderr) => assert!(stderr.contains("script blew up")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn missing_interpreter_is_an_internal_error() {
        let staged = stage("return 1");
        let path = staged.path().to_path_buf();
        let outcome = LocalRunner::with_interpreter("/no/such/interpreter")
            .run(staged, 10)
            .await;
        assert!(matches!(outcome, Outcome::Internal(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn concurrent_runs_do_not_cross_contaminate() {
        let runs = (0..4).map(|i| {
            let runner = LocalRunner::with_interpreter("/bin/sh");
            async move {
                let staged = stage(&format!("echo run-{i}"));
                runner.run(staged, 10).await
            }
        });
        let outcomes = futures_join(runs).await;
        for (i, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Outcome::Success(stdout) => assert_eq!(stdout, format!("run-{i}\n")),
                other => panic!("expected success, got {other:?}"),
            }
        }
    }

    async fn futures_join<I, F>(iter: I) -> Vec<Outcome>
    where
        I: IntoIterator<Item = F>,
        F: std::future::Future<Output = Outcome> + Send + 'static,
    {
        let handles: Vec<_> = iter.into_iter().map(tokio::spawn).collect();
        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }
        outcomes
    }
}
