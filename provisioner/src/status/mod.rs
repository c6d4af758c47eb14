//! # Status Table
//!
//! Builds the first row a device gets in the status table. Telemetry the
//! device has not reported yet is stored as the `"null"` sentinel; the
//! device overwrites these fields once it comes online.

use std::collections::BTreeMap;

use async_trait::async_trait;

use shared::{
    config::ManufacturingConfig,
    constants::{INITIAL_DEVICE_STATUS, UNSET},
    error::ProvisionResult,
    types::{ProductVariant, ProvisioningContext},
};

/// Operations against the status table
#[async_trait]
pub trait StatusTable: Send + Sync {
    /// Write a row, replacing any row with the same key
    async fn put_item(&self, table: &str, item: &StatusItem) -> ProvisionResult<()>;
}

/// Attribute value stored in the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusValue {
    Text(String),
    Number(i64),
}

impl From<&str> for StatusValue {
    fn from(s: &str) -> Self {
        StatusValue::Text(s.to_string())
    }
}

impl From<String> for StatusValue {
    fn from(s: String) -> Self {
        StatusValue::Text(s)
    }
}

impl From<i64> for StatusValue {
    fn from(n: i64) -> Self {
        StatusValue::Number(n)
    }
}

/// Attribute name to value
pub type StatusItem = BTreeMap<String, StatusValue>;

/// Initial status row of one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    /// Table the row belongs in
    pub table: String,

    /// Names of the key attributes
    key_attributes: &'static [&'static str],

    /// All attributes, key included
    pub item: StatusItem,
}

const LOGI1_KEY: &[&str] = &["id"];
const LOGI2_KEY: &[&str] = &["PK", "SK"];

/// Telemetry fields a second-generation unit reports later
const LOGI2_PLACEHOLDERS: &[&str] = &[
    "Altitude",
    "BatteryVolts",
    "BLE_Status",
    "ChargerStatus",
    "DateTimeIso",
    "DeviceCity",
    "DeviceLevel",
    "DeviceState",
    "DeviceStreet",
    "DeviceZip",
    "ErrorLog",
    "FillDate",
    "GPS_SignalQual",
    "Latitude",
    "Longitude",
    "LTE_SignalQual",
    "SolarVolts",
    "TemperatureC",
];

impl StatusRecord {
    /// Initial row for the device in `ctx`
    pub fn initial(
        ctx: &ProvisioningContext,
        table: impl Into<String>,
        manufacturing: &ManufacturingConfig,
    ) -> Self {
        let (key_attributes, item) = match ctx.variant {
            ProductVariant::Logi1 => (LOGI1_KEY, logi1_item(ctx, manufacturing)),
            ProductVariant::Logi2 => (LOGI2_KEY, logi2_item(ctx, manufacturing)),
        };

        Self {
            table: table.into(),
            key_attributes,
            item,
        }
    }

    /// The primary key attributes of the row
    pub fn key(&self) -> StatusItem {
        self.item
            .iter()
            .filter(|(name, _)| self.key_attributes.iter().any(|k| *k == name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    pub fn get(&self, attribute: &str) -> Option<&StatusValue> {
        self.item.get(attribute)
    }
}

fn logi1_item(ctx: &ProvisioningContext, manufacturing: &ManufacturingConfig) -> StatusItem {
    let mut item = StatusItem::new();
    item.insert("id".into(), ctx.device_id.to_string().into());
    item.insert("serial".into(), manufacturing.serial.clone().into());
    item.insert("sim".into(), manufacturing.sim(ctx.variant).into());
    item
}

fn logi2_item(ctx: &ProvisioningContext, manufacturing: &ManufacturingConfig) -> StatusItem {
    let mut item = StatusItem::new();

    item.insert("PK".into(), ctx.device_id.partition_key().into());
    item.insert("SK".into(), ctx.device_id.sort_key().into());

    for field in LOGI2_PLACEHOLDERS {
        item.insert((*field).into(), UNSET.into());
    }

    item.insert("BirthDate".into(), ctx.birth_date().into());
    item.insert("CycleCount".into(), 0i64.into());
    item.insert("DailyUsage".into(), 0i64.into());
    item.insert(
        "DeviceAuth".into(),
        i64::from(ctx.device_auth.unwrap_or_default()).into(),
    );
    item.insert("DeviceID".into(), ctx.device_id.to_string().into());
    item.insert("DeviceStatus".into(), INITIAL_DEVICE_STATUS.into());
    item.insert("IMEI".into(), manufacturing.imei.clone().into());
    item.insert("MQTT_Schema".into(), manufacturing.mqtt_schema.clone().into());
    item.insert("Provider".into(), manufacturing.provider.clone().into());
    item.insert("Serial".into(), manufacturing.serial.clone().into());
    item.insert("SIM".into(), manufacturing.sim(ctx.variant).into());
    item.insert("Version".into(), manufacturing.firmware_version.clone().into());

    item
}
