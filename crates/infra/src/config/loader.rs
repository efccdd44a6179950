//! Credential resolution
//!
//! Assembles [`Credentials`] from ordered variable stores.
//!
//! ## Sources
//! - [`ProcessEnv`]: `RTM_API_KEY`, `RTM_SECRET_KEY`, `RTM_TOKEN_PATH`,
//!   `RTM_TOKEN`, optionally seeded from a `.env` file
//! - [`HostVariables`]: editor globals `rtm_api_key`, `rtm_secret_key`,
//!   `setting_path`, `rtm_token`
//! - [`FileStore`]: a `.toml` or `.json` settings file with `api_key`,
//!   `api_secret_key`, `token_path` and `token`
//!
//! Each field is taken from the first store that yields a non-empty value.
//! Hosts report undefined globals as `""`, so empty strings count as unset.
//! When no store names a token path, `~/.rtm_token` is used.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use rtm_domain::{Credentials, Result, RtmError};
use serde::Deserialize;

use crate::errors::InfraError;

/// Default token file name, relative to the home directory
pub const DEFAULT_TOKEN_FILE: &str = ".rtm_token";

/// Fields a store can supply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    ApiKey,
    ApiSecretKey,
    TokenPath,
    Token,
}

impl CredentialKey {
    pub const ALL: [Self; 4] = [Self::ApiKey, Self::ApiSecretKey, Self::TokenPath, Self::Token];

    /// Environment variable name.
    pub fn env_var(self) -> &'static str {
        match self {
            Self::ApiKey => "RTM_API_KEY",
            Self::ApiSecretKey => "RTM_SECRET_KEY",
            Self::TokenPath => "RTM_TOKEN_PATH",
            Self::Token => "RTM_TOKEN",
        }
    }

    /// Host/editor global name.
    pub fn host_var(self) -> &'static str {
        match self {
            Self::ApiKey => "rtm_api_key",
            Self::ApiSecretKey => "rtm_secret_key",
            Self::TokenPath => "setting_path",
            Self::Token => "rtm_token",
        }
    }
}

/// A key/value source consulted by [`CredentialResolver`]
pub trait VariableStore: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Raw value for `key`, empty strings included.
    fn get(&self, key: CredentialKey) -> Option<String>;
}

/// Process environment
#[derive(Debug, Clone, Default)]
pub struct ProcessEnv;

impl ProcessEnv {
    pub fn new() -> Self {
        Self
    }

    /// Load `.env` from the working directory (or a parent) into the
    /// process environment first. Variables already set are kept.
    pub fn with_dotenv() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
            Err(err) if err.not_found() => {}
            Err(err) => tracing::warn!(error = %err, "Ignoring unreadable .env file"),
        }
        Self
    }
}

impl VariableStore for ProcessEnv {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, key: CredentialKey) -> Option<String> {
        std::env::var(key.env_var()).ok()
    }
}

/// Variables handed over by a host application (editor globals)
#[derive(Debug, Clone, Default)]
pub struct HostVariables {
    vars: HashMap<String, String>,
}

impl HostVariables {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HostVariables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

impl VariableStore for HostVariables {
    fn name(&self) -> &str {
        "host"
    }

    fn get(&self, key: CredentialKey) -> Option<String> {
        self.vars.get(key.host_var()).cloned()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FileSettings {
    api_key: Option<String>,
    api_secret_key: Option<String>,
    token_path: Option<String>,
    token: Option<String>,
}

/// Settings file (TOML or JSON)
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    settings: FileSettings,
}

impl FileStore {
    /// Read and parse a settings file.
    ///
    /// Format is detected by file extension (`.json` or `.toml`).
    ///
    /// # Errors
    /// Returns `RtmError::Config` if the file is missing, unreadable or
    /// malformed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(RtmError::Config(format!("Settings file not found: {}", path.display())));
        }

        tracing::info!(path = %path.display(), "Loading settings file");

        let contents = std::fs::read_to_string(&path)
            .map_err(|e| RtmError::Config(format!("Failed to read settings file: {e}")))?;
        let settings = parse_settings(&contents, &path)?;

        Ok(Self { path, settings })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VariableStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    fn get(&self, key: CredentialKey) -> Option<String> {
        match key {
            CredentialKey::ApiKey => self.settings.api_key.clone(),
            CredentialKey::ApiSecretKey => self.settings.api_secret_key.clone(),
            CredentialKey::TokenPath => self.settings.token_path.clone(),
            CredentialKey::Token => self.settings.token.clone(),
        }
    }
}

fn parse_settings(contents: &str, path: &Path) -> Result<FileSettings> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents).map_err(|e| RtmError::from(InfraError::from(e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| RtmError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(RtmError::Config(format!("Unsupported settings format: {extension}"))),
    }
}

/// Layered credential lookup
#[derive(Default)]
pub struct CredentialResolver {
    sources: Vec<Box<dyn VariableStore>>,
    default_token_path: Option<PathBuf>,
}

impl CredentialResolver {
    /// Resolver with no sources and `~/.rtm_token` as the fallback path.
    pub fn new() -> Self {
        Self { sources: Vec::new(), default_token_path: default_token_path() }
    }

    /// Environment (with `.env`) followed by `host`.
    pub fn standard(host: HostVariables) -> Self {
        Self::new().with_source(ProcessEnv::with_dotenv()).with_source(host)
    }

    /// Append a source; earlier sources win.
    #[must_use]
    pub fn with_source(mut self, source: impl VariableStore + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Override the fallback token path.
    #[must_use]
    pub fn with_default_token_path(mut self, path: Option<PathBuf>) -> Self {
        self.default_token_path = path;
        self
    }

    /// First non-empty value for `key` across sources.
    pub fn lookup(&self, key: CredentialKey) -> Option<String> {
        self.sources.iter().find_map(|source| {
            let value = source.get(key).filter(|value| !value.trim().is_empty())?;
            tracing::debug!(?key, source = source.name(), "Resolved credential field");
            Some(value)
        })
    }

    /// Assemble credentials.
    ///
    /// # Errors
    /// Returns `RtmError::Config` naming the missing field when the API key
    /// or secret is not provided by any source.
    pub fn resolve(&self) -> Result<Credentials> {
        let api_key = self.require(CredentialKey::ApiKey)?;
        let api_secret_key = self.require(CredentialKey::ApiSecretKey)?;

        let mut credentials = Credentials::new(api_key, api_secret_key)?;
        credentials.token_path = self
            .lookup(CredentialKey::TokenPath)
            .map(|path| expand_home(&path))
            .or_else(|| self.default_token_path.clone());
        credentials.token = self.lookup(CredentialKey::Token);

        Ok(credentials)
    }

    fn require(&self, key: CredentialKey) -> Result<String> {
        self.lookup(key).ok_or_else(|| {
            let searched: Vec<&str> = self.sources.iter().map(|s| s.name()).collect();
            RtmError::Config(format!(
                "{} is not set (set {} or the {} variable; searched: {})",
                match key {
                    CredentialKey::ApiKey => "API key",
                    CredentialKey::ApiSecretKey => "API secret key",
                    CredentialKey::TokenPath => "token path",
                    CredentialKey::Token => "token",
                },
                key.env_var(),
                key.host_var(),
                if searched.is_empty() { "nothing".to_string() } else { searched.join(", ") }
            ))
        })
    }
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.sources.iter().map(|s| s.name()).collect();
        f.debug_struct("CredentialResolver")
            .field("sources", &names)
            .field("default_token_path", &self.default_token_path)
            .finish()
    }
}

/// `~/.rtm_token`, if a home directory is known.
pub fn default_token_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULT_TOKEN_FILE))
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
