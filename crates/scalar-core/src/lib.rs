//! scalar-core: Shared types, errors, and configuration
//!
//! This crate provides the foundational types used across the bridge workspace.

pub mod config;
pub mod errors;
pub mod protocol;
pub mod types;

pub use config::*;
pub use errors::*;
pub use protocol::*;
pub use types::*;
