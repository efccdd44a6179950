//! # RTM Infrastructure
//!
//! I/O side of the Remember The Milk client.
//!
//! This crate contains:
//! - The REST client, request signing and pacing
//! - Timeline caching and the authorization handshake
//! - Credential resolution and the token file
//!
//! ## Architecture
//! - Builds on the pure types in `rtm-domain`
//! - Clock, pacing and retry primitives come from `rtm-common`
//! - Every network call goes through `api::RequestExecutor`

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod token_file;

// Re-export commonly used items
pub use api::{
    AuthorizationPrompt, RequestExecutor, RtmClient, RtmClientBuilder, RtmClientConfig, Signer,
    StdinPrompt,
};
pub use config::{CredentialResolver, HostVariables};
pub use errors::InfraError;
pub use http::HttpClient;
pub use token_file::TokenFile;
