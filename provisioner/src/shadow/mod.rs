//! # Device Shadow
//!
//! Builds the initial reported-state document for a new device and defines
//! the seam to the shadow service.
//!
//! The two product lines report different fields:
//!
//! ```json
//! // logi-1 (named shadow "logi-1-shadow")
//! {"state":{"reported":{"id":"…","serial":"1","sim":"…","user_id":"null"}}}
//!
//! // logi-2 (classic shadow)
//! {"state":{"reported":{"topic":"logi2/device/…","status":"0","device_id":"…",
//!                       "mqtt_schema":"2.0","device_auth":123456}}}
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use shared::{
    config::ManufacturingConfig,
    constants::{INITIAL_DEVICE_STATUS, UNSET},
    error::ProvisionResult,
    types::{ProductVariant, ProvisioningContext},
};

/// Operations against the device shadow service
#[async_trait]
pub trait ShadowService: Send + Sync {
    /// Replace the shadow's desired/reported state with `payload`
    async fn update_shadow(
        &self,
        thing_name: &str,
        shadow_name: Option<&str>,
        payload: Vec<u8>,
    ) -> ProvisionResult<()>;

    async fn delete_shadow(&self, thing_name: &str, shadow_name: Option<&str>)
        -> ProvisionResult<()>;
}

/// Shadow update document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowDocument {
    pub state: ShadowState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowState {
    pub reported: ReportedState,
}

/// Initial reported state, per product line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportedState {
    Logi1 {
        id: String,
        serial: String,
        sim: String,
        user_id: String,
    },
    Logi2 {
        topic: String,
        status: String,
        device_id: String,
        mqtt_schema: String,
        device_auth: u32,
    },
}

impl ShadowDocument {
    /// Initial document for the device in `ctx`
    pub fn initial(ctx: &ProvisioningContext, manufacturing: &ManufacturingConfig) -> Self {
        let reported = match ctx.variant {
            ProductVariant::Logi1 => ReportedState::Logi1 {
                id: ctx.device_id.to_string(),
                serial: manufacturing.serial.clone(),
                sim: manufacturing.sim(ctx.variant).to_string(),
                user_id: UNSET.into(),
            },
            ProductVariant::Logi2 => ReportedState::Logi2 {
                topic: ctx.device_id.topic(),
                status: INITIAL_DEVICE_STATUS.into(),
                device_id: ctx.device_id.to_string(),
                mqtt_schema: manufacturing.mqtt_schema.clone(),
                device_auth: ctx.device_auth.unwrap_or_default(),
            },
        };

        Self {
            state: ShadowState { reported },
        }
    }

    /// JSON payload sent to the shadow service
    pub fn to_payload(&self) -> ProvisionResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
