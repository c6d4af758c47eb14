//! # Configuration for the Device Provisioner
//!
//! Defaults describe the manufacturing line; environment variables override
//! them, and the CLI overrides both.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{ProvisionError, ProvisionResult};
use crate::types::ProductVariant;

// =============================================================================
// AWS CONFIGURATION
// =============================================================================

/// Where the remote services live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    /// AWS region
    pub region: String,

    /// IoT data-plane endpoint; discovered through `DescribeEndpoint` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_endpoint: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.into(),
            data_endpoint: None,
        }
    }
}

// =============================================================================
// REGISTRY CONFIGURATION
// =============================================================================

/// How things and certificates are registered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Thing type; the product line's default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thing_type: Option<String>,

    /// Policy attached to each new certificate
    pub policy_name: String,

    /// Thing group new things join, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thing_group: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            thing_type: None,
            policy_name: DEFAULT_POLICY_NAME.into(),
            thing_group: None,
        }
    }
}

// =============================================================================
// OUTPUT CONFIGURATION
// =============================================================================

/// Local files produced by a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory created for the credential files
    pub key_dir: PathBuf,

    /// Label image path
    pub label_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            key_dir: PathBuf::from(DEFAULT_KEY_DIR),
            label_path: PathBuf::from(DEFAULT_LABEL_PATH),
        }
    }
}

// =============================================================================
// MANUFACTURING CONFIGURATION
// =============================================================================

/// Per-unit values entered at the bench
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManufacturingConfig {
    /// SIM card id; the product line's default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sim: Option<String>,

    /// Modem IMEI
    pub imei: String,

    /// Serial number
    pub serial: String,

    /// Distributor name
    pub provider: String,

    /// MQTT payload schema version
    pub mqtt_schema: String,

    /// Firmware component versions
    pub firmware_version: String,
}

impl ManufacturingConfig {
    /// Effective SIM card id for `variant`
    pub fn sim(&self, variant: ProductVariant) -> &str {
        self.sim.as_deref().unwrap_or_else(|| variant.default_sim())
    }
}

impl Default for ManufacturingConfig {
    fn default() -> Self {
        Self {
            sim: None,
            imei: DEFAULT_IMEI.into(),
            serial: DEFAULT_SERIAL.into(),
            provider: DEFAULT_PROVIDER.into(),
            mqtt_schema: DEFAULT_MQTT_SCHEMA.into(),
            firmware_version: DEFAULT_FIRMWARE_VERSION.into(),
        }
    }
}

// =============================================================================
// PROVISIONER CONFIGURATION
// =============================================================================

/// Configuration for a provisioning run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionerConfig {
    /// Product line
    pub variant: ProductVariant,

    /// AWS settings
    pub aws: AwsConfig,

    /// Registry settings
    pub registry: RegistryConfig,

    /// Status table; the product line's default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_table: Option<String>,

    /// Local output paths
    pub output: OutputConfig,

    /// Bench values
    pub manufacturing: ManufacturingConfig,

    /// Undo completed steps when a later one fails
    pub rollback_on_failure: bool,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            variant: ProductVariant::default(),
            aws: AwsConfig::default(),
            registry: RegistryConfig::default(),
            status_table: None,
            output: OutputConfig::default(),
            manufacturing: ManufacturingConfig::default(),
            rollback_on_failure: true,
        }
    }
}

impl ProvisionerConfig {
    /// Default configuration for a product line
    pub fn for_variant(variant: ProductVariant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    /// Effective thing type
    pub fn thing_type(&self) -> &str {
        self.registry
            .thing_type
            .as_deref()
            .unwrap_or_else(|| self.variant.thing_type())
    }

    /// Effective status table
    pub fn status_table(&self) -> &str {
        self.status_table
            .as_deref()
            .unwrap_or_else(|| self.variant.status_table())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> ProvisionResult<Self> {
        let mut config = Self::default();

        if let Ok(variant) = env::var(ENV_VARIANT) {
            config.variant = variant.parse()?;
        }

        // Region: explicit override first, then the standard AWS variable
        if let Ok(region) = env::var(ENV_REGION).or_else(|_| env::var(ENV_AWS_REGION)) {
            config.aws.region = region;
        }

        if let Ok(endpoint) = env::var(ENV_DATA_ENDPOINT) {
            config.aws.data_endpoint = Some(endpoint);
        }

        if let Ok(policy) = env::var(ENV_POLICY_NAME) {
            config.registry.policy_name = policy;
        }

        if let Ok(group) = env::var(ENV_THING_GROUP) {
            config.registry.thing_group = Some(group);
        }

        if let Ok(dir) = env::var(ENV_KEY_DIR) {
            config.output.key_dir = PathBuf::from(dir);
        }

        if let Ok(path) = env::var(ENV_LABEL_PATH) {
            config.output.label_path = PathBuf::from(path);
        }

        if let Ok(sim) = env::var(ENV_SIM) {
            config.manufacturing.sim = Some(sim);
        }

        if let Ok(imei) = env::var(ENV_IMEI) {
            config.manufacturing.imei = imei;
        }

        if let Ok(serial) = env::var(ENV_SERIAL) {
            config.manufacturing.serial = serial;
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ProvisionResult<()> {
        require("region", &self.aws.region)?;
        require("thing type", self.thing_type())?;
        require("policy name", &self.registry.policy_name)?;
        require("status table", self.status_table())?;
        require("serial", &self.manufacturing.serial)?;
        require("sim", self.manufacturing.sim(self.variant))?;

        if self.variant == ProductVariant::Logi2 {
            require("imei", &self.manufacturing.imei)?;
            require("mqtt schema", &self.manufacturing.mqtt_schema)?;
        }

        if self.output.key_dir.as_os_str().is_empty() {
            return Err(ProvisionError::ConfigurationError(
                "key directory must not be empty".into(),
            ));
        }

        if self.output.label_path.file_name().is_none() {
            return Err(ProvisionError::ConfigurationError(format!(
                "label path '{}' does not name a file",
                self.output.label_path.display()
            )));
        }

        Ok(())
    }
}

fn require(name: &str, value: &str) -> ProvisionResult<()> {
    if value.trim().is_empty() {
        return Err(ProvisionError::ConfigurationError(format!(
            "{} must not be empty",
            name
        )));
    }
    Ok(())
}
