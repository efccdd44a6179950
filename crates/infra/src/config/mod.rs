//! Credential loading
//!
//! Resolves API keys and the token source from the environment, host
//! variables and settings files.

pub mod loader;

// Re-export commonly used items
pub use loader::{
    default_token_path, CredentialKey, CredentialResolver, FileStore, HostVariables, ProcessEnv,
    VariableStore, DEFAULT_TOKEN_FILE,
};
