//! AWS IoT data plane backing [`ShadowService`].

use async_trait::async_trait;
use aws_sdk_iotdataplane::primitives::Blob;

use shared::error::{ProvisionError, ProvisionResult};

use super::error_chain;
use crate::shadow::ShadowService;

/// Device shadow client
pub struct IotShadowService {
    client: aws_sdk_iotdataplane::Client,
}

impl IotShadowService {
    pub fn new(client: aws_sdk_iotdataplane::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ShadowService for IotShadowService {
    async fn update_shadow(
        &self,
        thing_name: &str,
        shadow_name: Option<&str>,
        payload: Vec<u8>,
    ) -> ProvisionResult<()> {
        self.client
            .update_thing_shadow()
            .thing_name(thing_name)
            .set_shadow_name(shadow_name.map(str::to_string))
            .payload(Blob::new(payload))
            .send()
            .await
            .map_err(|e| ProvisionError::ShadowError {
                operation: "UpdateThingShadow",
                reason: error_chain(e),
            })?;
        Ok(())
    }

    async fn delete_shadow(
        &self,
        thing_name: &str,
        shadow_name: Option<&str>,
    ) -> ProvisionResult<()> {
        self.client
            .delete_thing_shadow()
            .thing_name(thing_name)
            .set_shadow_name(shadow_name.map(str::to_string))
            .send()
            .await
            .map_err(|e| ProvisionError::ShadowError {
                operation: "DeleteThingShadow",
                reason: error_chain(e),
            })?;
        Ok(())
    }
}
