//! Plain-text auth token file
//!
//! The file holds the token and nothing else. Writes overwrite in place
//! without locking; concurrent writers race and the last one wins.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rtm_domain::{Result, RtmError};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored token.
    ///
    /// Returns `Ok(None)` when the file does not exist or holds only
    /// whitespace. One trailing line ending is stripped.
    pub fn read(&self) -> Result<Option<String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Token file not found");
                return Ok(None);
            }
            Err(err) => {
                return Err(RtmError::Io(format!(
                    "Failed to read token file {}: {err}",
                    self.path.display()
                )))
            }
        };

        let token = strip_line_ending(&contents);
        if token.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(token.to_string()))
    }

    /// Persist `token`, replacing any previous content.
    pub fn write(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                RtmError::Io(format!("Failed to create {}: {err}", parent.display()))
            })?;
        }
        fs::write(&self.path, token).map_err(|err| {
            RtmError::Io(format!("Failed to write token file {}: {err}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), "Token file written");
        Ok(())
    }
}

fn strip_line_ending(contents: &str) -> &str {
    contents
        .strip_suffix("\r\n")
        .or_else(|| contents.strip_suffix('\n'))
        .unwrap_or(contents)
}
