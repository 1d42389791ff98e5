//! Per-session JSON log files.
//!
//! One file per session holds the full ordered iteration log and is
//! atomically rewritten on every append. File names embed the session
//! token, which sorts temporally, so the latest session is the lexically
//! greatest file name.

use crate::error::MemoryError;
use crate::model::Iteration;
use log::{debug, info};
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const FILE_PREFIX: &str = "session_";
const FILE_SUFFIX: &str = ".json";

/// File sink writing one session log per session token.
pub struct SessionFileSink {
    /// Root directory for session logs.
    root: PathBuf,
    /// Serialize write access to log files.
    write_lock: Mutex<()>,
}

impl SessionFileSink {
    /// Create a new sink under the given root directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!("initialized session file sink (root={})", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the log file for a session token.
    pub fn path_for(&self, token: &str) -> PathBuf {
        self.root.join(format!("{FILE_PREFIX}{token}{FILE_SUFFIX}"))
    }

    /// Atomically rewrite a session's full log.
    pub fn write(&self, token: &str, iterations: &[Iteration]) -> Result<(), MemoryError> {
        let _guard = self.write_lock.lock();
        let path = self.path_for(token);
        let temp_path = self.root.join(format!("{FILE_PREFIX}{token}{FILE_SUFFIX}.tmp"));
        {
            let mut file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&temp_path)?;
            let body = serde_json::to_string_pretty(iterations)?;
            file.write_all(body.as_bytes())?;
            writeln!(file)?;
        }
        if path.exists() {
            fs::remove_file(&path)?;
        }
        fs::rename(temp_path, path)?;
        debug!(
            "rewrote session log (token={}, iterations={})",
            token,
            iterations.len()
        );
        Ok(())
    }

    /// Load a session's full log; `None` when no file exists.
    pub fn load(&self, token: &str) -> Result<Option<Vec<Iteration>>, MemoryError> {
        let path = self.path_for(token);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        let iterations: Vec<Iteration> = serde_json::from_str(&contents)?;
        Ok(Some(iterations))
    }

    /// Lexically greatest session token found under the root, if any.
    pub fn latest_token(&self) -> Result<Option<String>, MemoryError> {
        let mut latest: Option<String> = None;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(stem) = name
                .strip_prefix(FILE_PREFIX)
                .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
            else {
                continue;
            };
            if latest.as_deref().is_none_or(|current| stem > current) {
                latest = Some(stem.to_string());
            }
        }
        Ok(latest)
    }
}
