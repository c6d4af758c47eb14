//! # Shared Data Types for the Device Provisioner
//!
//! Typed contracts for everything that crosses a service boundary during a
//! provisioning run, plus the per-run context threaded through each step.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::*;
use crate::error::ProvisionError;

// =============================================================================
// PRODUCT VARIANT
// =============================================================================

/// Product line being provisioned
///
/// The two lines use different identifier formats, shadow shapes and status
/// tables. They are deliberately not merged into one schema.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProductVariant {
    /// First-generation unit (`LOGI-1`)
    Logi1,
    /// Second-generation unit (`LOGI-2`)
    #[default]
    Logi2,
}

impl ProductVariant {
    /// Registry thing type for this line
    pub fn thing_type(&self) -> &'static str {
        match self {
            ProductVariant::Logi1 => LOGI1_THING_TYPE,
            ProductVariant::Logi2 => LOGI2_THING_TYPE,
        }
    }

    /// Status table the line writes to
    pub fn status_table(&self) -> &'static str {
        match self {
            ProductVariant::Logi1 => LOGI1_STATUS_TABLE,
            ProductVariant::Logi2 => LOGI2_STATUS_TABLE,
        }
    }

    /// SIM card id used when the bench does not enter one
    pub fn default_sim(&self) -> &'static str {
        match self {
            ProductVariant::Logi1 => LOGI1_DEFAULT_SIM,
            ProductVariant::Logi2 => LOGI2_DEFAULT_SIM,
        }
    }

    /// Named shadow, or `None` for the classic shadow
    pub fn shadow_name(&self) -> Option<&'static str> {
        match self {
            ProductVariant::Logi1 => Some(LOGI1_SHADOW_NAME),
            ProductVariant::Logi2 => None,
        }
    }

    /// Whether units of this line carry a device authentication code
    pub fn uses_device_auth(&self) -> bool {
        matches!(self, ProductVariant::Logi2)
    }
}

impl fmt::Display for ProductVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductVariant::Logi1 => write!(f, "logi-1"),
            ProductVariant::Logi2 => write!(f, "logi-2"),
        }
    }
}

impl FromStr for ProductVariant {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "logi-1" | "logi1" => Ok(ProductVariant::Logi1),
            "logi-2" | "logi2" => Ok(ProductVariant::Logi2),
            _ => Err(ProvisionError::UnknownVariant(s.to_string())),
        }
    }
}

// =============================================================================
// DEVICE IDENTIFIER
// =============================================================================

/// Unique device name, used as the thing name and in every derived record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Generate a fresh identifier in the format of the given product line
    pub fn generate(variant: ProductVariant) -> Self {
        let uuid = Uuid::new_v4();
        match variant {
            ProductVariant::Logi1 => Self(uuid.simple().to_string()),
            ProductVariant::Logi2 => Self(uuid.hyphenated().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Status table partition key (`DEV#<id>`)
    pub fn partition_key(&self) -> String {
        format!("{}{}", STATUS_PARTITION_PREFIX, self.0)
    }

    /// Status table sort key (`STATUS#<id>`)
    pub fn sort_key(&self) -> String {
        format!("{}{}", STATUS_SORT_PREFIX, self.0)
    }

    /// MQTT topic the device publishes on
    pub fn topic(&self) -> String {
        format!("{}{}", LOGI2_TOPIC_PREFIX, self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// REGISTRY RESPONSES
// =============================================================================

/// Result of registering a thing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThingRegistration {
    /// Name the thing was registered under
    pub thing_name: String,

    /// Resource reference of the thing
    pub thing_arn: String,

    /// Registry-assigned thing id
    pub thing_id: String,
}

/// Keys and certificate issued by the registry
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialBundle {
    /// Certificate id
    pub certificate_id: String,

    /// Certificate resource reference (principal for policies and things)
    pub certificate_arn: String,

    /// Certificate in PEM format
    pub certificate_pem: String,

    /// Public key in PEM format
    pub public_key: String,

    /// Private key in PEM format
    pub private_key: String,
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("certificate_id", &self.certificate_id)
            .field("certificate_arn", &self.certificate_arn)
            .field("private_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

// =============================================================================
// WORKFLOW
// =============================================================================

/// The five provisioning steps, in execution order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningStep {
    RegisterIdentity,
    IssueCredentials,
    GenerateLabel,
    UpdateShadow,
    WriteStatusRecord,
}

impl ProvisioningStep {
    /// All steps in the order they run
    pub const ALL: [ProvisioningStep; 5] = [
        ProvisioningStep::RegisterIdentity,
        ProvisioningStep::IssueCredentials,
        ProvisioningStep::GenerateLabel,
        ProvisioningStep::UpdateShadow,
        ProvisioningStep::WriteStatusRecord,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningStep::RegisterIdentity => "register_identity",
            ProvisioningStep::IssueCredentials => "issue_credentials",
            ProvisioningStep::GenerateLabel => "generate_label",
            ProvisioningStep::UpdateShadow => "update_shadow",
            ProvisioningStep::WriteStatusRecord => "write_status_record",
        }
    }
}

impl fmt::Display for ProvisioningStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-run values shared by every step
///
/// Built once when a run starts and passed by reference to each step, so
/// every record written carries the same identifier and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningContext {
    /// Device identifier used everywhere
    pub device_id: DeviceId,

    /// Product line
    pub variant: ProductVariant,

    /// Registry thing type
    pub thing_type: String,

    /// Six-digit authentication code, if the line uses one
    pub device_auth: Option<u32>,

    /// Run start time, stored as the device birth date
    pub created_at: DateTime<Utc>,
}

impl ProvisioningContext {
    /// Start a new run with a freshly generated identifier
    pub fn generate(variant: ProductVariant, thing_type: impl Into<String>) -> Self {
        Self::with_device_id(DeviceId::generate(variant), variant, thing_type)
    }

    /// Start a run for a known identifier
    pub fn with_device_id(
        device_id: DeviceId,
        variant: ProductVariant,
        thing_type: impl Into<String>,
    ) -> Self {
        let device_auth = variant
            .uses_device_auth()
            .then(generate_device_auth);

        Self {
            device_id,
            variant,
            thing_type: thing_type.into(),
            device_auth,
            created_at: Utc::now(),
        }
    }

    /// Birth date as stored in the status table
    pub fn birth_date(&self) -> String {
        self.created_at.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

/// Random six-digit device authentication code
pub fn generate_device_auth() -> u32 {
    rand::thread_rng().gen_range(DEVICE_AUTH_MIN..=DEVICE_AUTH_MAX)
}

/// Summary of a successful run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningReport {
    /// Device identifier
    pub device_id: DeviceId,

    /// Product line
    pub variant: ProductVariant,

    /// Registered thing
    pub thing: ThingRegistration,

    /// Id of the issued certificate
    pub certificate_id: String,

    /// Directory holding the credential files
    pub key_dir: PathBuf,

    /// Label image path
    pub label_path: PathBuf,

    /// Device authentication code, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_auth: Option<u32>,

    /// Status table the row was written to
    pub status_table: String,

    /// When the run started
    pub created_at: DateTime<Utc>,
}
