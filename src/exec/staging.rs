//! # Temp-File Staging
//!
//! The interpreter only accepts file paths, not inline text, so every run
//! stages the script to disk first. The runner that created the file owns
//! its deletion and must attempt it on every exit path.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use tracing::{debug, warn};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Millisecond timestamp plus a process-wide sequence number, so concurrent
/// invocations landing in the same millisecond still get distinct names.
pub fn unique_name() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("applescript_{millis}_{seq}.scpt")
}

/// A script persisted under the system temp directory.
#[derive(Debug)]
pub struct StagedScript {
    path: PathBuf,
}

impl StagedScript {
    pub fn write(script: &str) -> Result<Self> {
        let path = std::env::temp_dir().join(unique_name());
        std::fs::write(&path, script)
            .with_context(|| format!("failed to stage script at {}", path.display()))?;
        debug!(path = %path.display(), "staged script");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best effort: a staged file left behind is only worth a warning.
    pub fn remove(self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %err, "failed to delete staged script");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn write_persists_script_text() {
        let staged = StagedScript::write("display dialog \"hi\"").unwrap();
        let contents = std::fs::read_to_string(staged.path()).unwrap();
        assert_eq!(contents, "display dialog \"hi\"");
        staged.remove();
    }

    #[test]
    fn remove_deletes_the_file() {
        let staged = StagedScript::write("return 1").unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        staged.remove();
        assert!(!path.exists());
    }

    #[test]
    fn names_are_unique_within_a_millisecond() {
        let names: HashSet<String> = (0..256).map(|_| unique_name()).collect();
        assert_eq!(names.len(), 256);
    }

    #[test]
    fn names_carry_the_script_extension() {
        assert!(unique_name().ends_with(".scpt"));
    }
}
