//! Persisted session storage.
//!
//! Stores the bearer token in `<base>/session.json` under the fixed key
//! `token`, with restricted permissions (0600). Tokens are never logged.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::paths;

/// On-disk session layout.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

/// Durable storage for the bearer token.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::at(paths::session_path())
    }
}

impl SessionStore {
    /// Creates a store backed by a specific file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted token, if any.
    /// Returns `None` if the file doesn't exist, holds a blank token or is
    /// not valid JSON. A corrupt file is overwritten by the next save or clear.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read.
    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session from {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(None);
        }

        let file: SessionFile = match serde_json::from_str(&contents) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
                return Ok(None);
            }
        };

        Ok(file.token.filter(|t| !t.trim().is_empty()))
    }

    /// Persists the token with restricted permissions (0600).
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&self, token: &str) -> Result<()> {
        self.write(&SessionFile {
            token: Some(token.to_string()),
        })
    }

    /// Removes the persisted token.
    /// Returns whether a token was present.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or rewritten.
    pub fn clear(&self) -> Result<bool> {
        let had_token = self.load()?.is_some();
        if self.path.exists() {
            self.write(&SessionFile::default())?;
        }
        Ok(had_token)
    }

    fn write(&self, file: &SessionFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(file).context("Failed to serialize session")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut handle = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            handle
                .write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, contents)
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        Ok(())
    }
}
