//! Credential bundle consumed by the client

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, RtmError};

/// API credentials for one client instance
///
/// `api_key` and `api_secret_key` are mandatory. The token comes from
/// `token`, from the file at `token_path`, or from the interactive
/// handshake, in that order.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret_key: String,
    #[serde(default)]
    pub token_path: Option<PathBuf>,
    #[serde(default)]
    pub token: Option<String>,
}

impl Credentials {
    /// Create credentials from the two mandatory keys.
    ///
    /// # Errors
    ///
    /// Returns `RtmError::Config` if either key is empty.
    pub fn new(api_key: impl Into<String>, api_secret_key: impl Into<String>) -> Result<Self> {
        let credentials = Self {
            api_key: api_key.into(),
            api_secret_key: api_secret_key.into(),
            token_path: None,
            token: None,
        };
        credentials.validate()?;
        Ok(credentials)
    }

    /// Attach an explicit auth token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Attach a token file path.
    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    /// Check that the mandatory keys are present.
    ///
    /// # Errors
    ///
    /// Returns `RtmError::Config` naming the first missing key.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(RtmError::Config("API key is required".into()));
        }
        if self.api_secret_key.trim().is_empty() {
            return Err(RtmError::Config("API secret key is required".into()));
        }
        Ok(())
    }

    /// Explicit token, ignoring empty strings.
    pub fn explicit_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|token| !token.is_empty())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret_key", &"<redacted>")
            .field("token_path", &self.token_path)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
