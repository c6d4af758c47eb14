//! # Error Types for the Device Provisioner
//!
//! Every failure a provisioning run can hit, grouped by the collaborator
//! that produced it.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ProvisioningStep;

/// Main error type for the provisioner
#[derive(Error, Debug)]
pub enum ProvisionError {
    // =========================================================================
    // REGISTRY ERRORS
    // =========================================================================

    /// A call to the IoT registry failed
    #[error("Registry call {operation} failed: {reason}")]
    RegistryError {
        operation: &'static str,
        reason: String,
    },

    /// A service answered without a field the workflow depends on
    #[error("{operation} response is missing '{field}'")]
    MalformedResponse {
        operation: &'static str,
        field: &'static str,
    },

    // =========================================================================
    // LOCAL STORAGE ERRORS
    // =========================================================================

    /// The key directory is left over from an earlier run
    #[error("Key directory already exists: {}", .0.display())]
    KeyDirectoryExists(PathBuf),

    /// Failed to read/write a local file
    #[error("Storage I/O error: {0}")]
    StorageIOError(String),

    /// Failed to render or save the QR label
    #[error("Label generation failed: {0}")]
    LabelError(String),

    // =========================================================================
    // DOWNSTREAM SERVICE ERRORS
    // =========================================================================

    /// Shadow update or delete failed
    #[error("Shadow call {operation} failed: {reason}")]
    ShadowError {
        operation: &'static str,
        reason: String,
    },

    /// Status table write or delete failed
    #[error("Status table call {operation} failed: {reason}")]
    StatusTableError {
        operation: &'static str,
        reason: String,
    },

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Unknown product variant name
    #[error("Unknown product variant '{0}' (expected logi-1 or logi-2)")]
    UnknownVariant(String),

    // =========================================================================
    // WORKFLOW ERRORS
    // =========================================================================

    /// A provisioning step failed; earlier steps may have been rolled back
    #[error("Provisioning step '{step}' failed: {source}")]
    StepFailed {
        step: ProvisioningStep,
        #[source]
        source: Box<ProvisionError>,
    },

    // =========================================================================
    // GENERIC ERRORS
    // =========================================================================

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type alias using ProvisionError
pub type ProvisionResult<T> = Result<T, ProvisionError>;

// =============================================================================
// ERROR CONVERSIONS
// =============================================================================

impl From<serde_json::Error> for ProvisionError {
    fn from(err: serde_json::Error) -> Self {
        ProvisionError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for ProvisionError {
    fn from(err: std::io::Error) -> Self {
        ProvisionError::StorageIOError(err.to_string())
    }
}

// =============================================================================
// ERROR CATEGORIES (for logging)
// =============================================================================

impl ProvisionError {
    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            ProvisionError::RegistryError { .. } | ProvisionError::MalformedResponse { .. } => {
                "registry"
            }

            ProvisionError::KeyDirectoryExists(_)
            | ProvisionError::StorageIOError(_)
            | ProvisionError::LabelError(_) => "storage",

            ProvisionError::ShadowError { .. } => "shadow",

            ProvisionError::StatusTableError { .. } => "status_table",

            ProvisionError::ConfigurationError(_) | ProvisionError::UnknownVariant(_) => "config",

            ProvisionError::StepFailed { source, .. } => source.category(),

            ProvisionError::SerializationError(_) => "internal",
        }
    }

    /// The step a workflow error was raised in, if any
    pub fn failed_step(&self) -> Option<ProvisioningStep> {
        match self {
            ProvisionError::StepFailed { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// The error underneath any step wrapper
    pub fn root(&self) -> &ProvisionError {
        match self {
            ProvisionError::StepFailed { source, .. } => source.root(),
            other => other,
        }
    }
}
