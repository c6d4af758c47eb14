//! # Shared Module for the Device Provisioner
//!
//! This crate provides the common types, errors, and configuration used by
//! the `provisioner` binary and its workflow steps.
//!
//! ## Provisioning at a glance
//!
//! Every physical unit leaving the line goes through the same five steps:
//!
//! | # | Step | Service |
//! |---|------|---------|
//! | 1 | Register the thing | AWS IoT registry |
//! | 2 | Issue certificate and keys, attach policy | AWS IoT registry |
//! | 3 | Render the QR label | local |
//! | 4 | Push the initial shadow | AWS IoT data plane |
//! | 5 | Write the status row | DynamoDB |
//!
//! The device identifier generated at the start of a run is the only thing
//! tying these records together.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use config::*;
pub use constants::*;
pub use error::*;
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
