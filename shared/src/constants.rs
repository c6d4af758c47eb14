//! # Constants for the Device Provisioner
//!
//! Defaults for the manufacturing line. Anything here can be overridden
//! through [`crate::config::ProvisionerConfig`].

// =============================================================================
// AWS
// =============================================================================

/// Region used when neither the environment nor the CLI names one
pub const DEFAULT_REGION: &str = "us-east-1";

/// Endpoint type requested from `DescribeEndpoint` for the shadow data plane
pub const IOT_DATA_ENDPOINT_TYPE: &str = "iot:Data-ATS";

/// Policy attached to every freshly issued certificate
pub const DEFAULT_POLICY_NAME: &str = "default-logi-policy";

// =============================================================================
// PRODUCT LINES
// =============================================================================

/// Thing type of the first-generation unit
pub const LOGI1_THING_TYPE: &str = "LOGI-1";

/// Thing type of the second-generation unit
pub const LOGI2_THING_TYPE: &str = "LOGI-2";

/// Named shadow used by first-generation units
pub const LOGI1_SHADOW_NAME: &str = "logi-1-shadow";

/// Status table of first-generation units
pub const LOGI1_STATUS_TABLE: &str = "logi-status";

/// Status table of second-generation units
pub const LOGI2_STATUS_TABLE: &str = "Centri_Main";

/// MQTT topic prefix for second-generation units
pub const LOGI2_TOPIC_PREFIX: &str = "logi2/device/";

/// Partition key prefix in the status table
pub const STATUS_PARTITION_PREFIX: &str = "DEV#";

/// Sort key prefix in the status table
pub const STATUS_SORT_PREFIX: &str = "STATUS#";

// =============================================================================
// DEVICE RECORD DEFAULTS
// =============================================================================

/// Sentinel stored for telemetry the device has not reported yet
pub const UNSET: &str = "null";

/// Initial device status flag
pub const INITIAL_DEVICE_STATUS: &str = "0";

/// MQTT payload schema version flashed on second-generation units
pub const DEFAULT_MQTT_SCHEMA: &str = "2.0";

/// Firmware component versions (main, modem, BLE)
pub const DEFAULT_FIRMWARE_VERSION: &str = "2.0,1.0,1.0";

/// Distributor shown in the status table
pub const DEFAULT_PROVIDER: &str = "Ford Propane";

/// SIM card id flashed on first-generation units
pub const LOGI1_DEFAULT_SIM: &str = "8944501705192074069";

/// Placeholder SIM card id for second-generation units
pub const LOGI2_DEFAULT_SIM: &str = "99";

/// Placeholder IMEI
pub const DEFAULT_IMEI: &str = "99";

/// Placeholder serial number
pub const DEFAULT_SERIAL: &str = "1";

/// Lower bound of the device authentication code (inclusive)
pub const DEVICE_AUTH_MIN: u32 = 100_000;

/// Upper bound of the device authentication code (inclusive)
pub const DEVICE_AUTH_MAX: u32 = 999_999;

// =============================================================================
// LOCAL FILES
// =============================================================================

/// Directory holding the credential files of a run
pub const DEFAULT_KEY_DIR: &str = "keys";

/// Label image written by every run
pub const DEFAULT_LABEL_PATH: &str = "qrcode.png";

/// Suffix of the public key file
pub const PUBLIC_KEY_SUFFIX: &str = ".public.key";

/// Suffix of the private key file
pub const PRIVATE_KEY_SUFFIX: &str = ".private.key";

/// Suffix of the certificate file
pub const CERTIFICATE_SUFFIX: &str = ".cert.pem";

/// Suffix of the plain-text identifier file
pub const IDENTIFIER_SUFFIX: &str = ".txt";

/// Pixels per QR module
pub const LABEL_MODULE_PIXELS: u32 = 10;

/// Quiet zone around the QR code, in modules
pub const LABEL_QUIET_ZONE_MODULES: u32 = 4;

// =============================================================================
// ENVIRONMENT VARIABLE NAMES
// =============================================================================

/// Region override
pub const ENV_REGION: &str = "PROVISION_REGION";

/// Standard AWS region variable, used as a fallback
pub const ENV_AWS_REGION: &str = "AWS_REGION";

/// Product variant (`logi-1` or `logi-2`)
pub const ENV_VARIANT: &str = "PROVISION_VARIANT";

/// Policy name override
pub const ENV_POLICY_NAME: &str = "PROVISION_POLICY_NAME";

/// Key directory override
pub const ENV_KEY_DIR: &str = "PROVISION_KEY_DIR";

/// Label path override
pub const ENV_LABEL_PATH: &str = "PROVISION_LABEL_PATH";

/// Thing group to add new things to
pub const ENV_THING_GROUP: &str = "PROVISION_THING_GROUP";

/// SIM card id of the unit on the bench
pub const ENV_SIM: &str = "PROVISION_SIM";

/// IMEI of the unit on the bench
pub const ENV_IMEI: &str = "PROVISION_IMEI";

/// Serial number of the unit on the bench
pub const ENV_SERIAL: &str = "PROVISION_SERIAL";

/// Explicit IoT data-plane endpoint (skips `DescribeEndpoint`)
pub const ENV_DATA_ENDPOINT: &str = "PROVISION_DATA_ENDPOINT";
