//! # Device Provisioner
//!
//! Manufacturing-line provisioning of IoT devices:
//! - Thing registration with the AWS IoT registry
//! - Certificate and key issuance, stored in a per-run key directory
//! - Policy attachment and certificate binding
//! - QR label rendering
//! - Initial device shadow and status table row
//!
//! The remote services sit behind the [`DeviceRegistry`], [`ShadowService`]
//! and [`StatusTable`] traits; [`aws`] provides the SDK-backed versions.

pub mod aws;
pub mod credentials;
pub mod label;
pub mod registry;
pub mod shadow;
pub mod status;
pub mod workflow;

// Re-export commonly used types
pub use aws::AwsServices;
pub use credentials::{CredentialFiles, CredentialStore};
pub use label::LabelRenderer;
pub use registry::DeviceRegistry;
pub use shadow::{ShadowDocument, ShadowService};
pub use status::{StatusRecord, StatusTable};
pub use workflow::Provisioner;
