//! # RTM Domain
//!
//! Domain types and models for the Remember The Milk API client.
//!
//! This crate contains:
//! - Credentials and task identity types
//! - The response envelope and typed task-list model
//! - Domain error types and Result definitions
//! - API constants (endpoints, method names, protocol defaults)
//!
//! ## Architecture
//! - No dependencies on other rtm crates
//! - No I/O; everything here is pure data and validation

pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::*;
pub use types::*;
