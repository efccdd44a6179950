//! Remember The Milk REST API
//!
//! Signing, pacing and retry, timeline handles, the authorization handshake
//! and the task operations built on top of them.

pub mod auth;
pub mod client;
pub mod executor;
pub mod signature;
pub mod timeline;

pub use auth::{authorization_url, AuthFlow, AuthState, AuthorizationPrompt, StdinPrompt};
pub use client::{RtmClient, RtmClientBuilder, RtmClientConfig};
pub use executor::RequestExecutor;
pub use signature::{params, sign, Params, Signer};
pub use timeline::{TimelineCache, TimelineCacheConfig};
