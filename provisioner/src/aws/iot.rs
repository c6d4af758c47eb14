//! AWS IoT control plane backing [`DeviceRegistry`].

use async_trait::async_trait;
use aws_sdk_iot::types::CertificateStatus;
use tracing::debug;

use shared::{
    error::{ProvisionError, ProvisionResult},
    types::{CredentialBundle, ThingRegistration},
};

use super::sdk_error;
use crate::registry::DeviceRegistry;

/// IoT registry client
pub struct IotRegistry {
    client: aws_sdk_iot::Client,
}

impl IotRegistry {
    pub fn new(client: aws_sdk_iot::Client) -> Self {
        Self { client }
    }
}

fn required(
    value: Option<&str>,
    operation: &'static str,
    field: &'static str,
) -> ProvisionResult<String> {
    value
        .map(str::to_string)
        .ok_or(ProvisionError::MalformedResponse { operation, field })
}

#[async_trait]
impl DeviceRegistry for IotRegistry {
    async fn create_thing(
        &self,
        thing_name: &str,
        thing_type: &str,
    ) -> ProvisionResult<ThingRegistration> {
        let output = self
            .client
            .create_thing()
            .thing_name(thing_name)
            .thing_type_name(thing_type)
            .send()
            .await
            .map_err(|e| sdk_error("CreateThing", e))?;

        debug!(response = ?output, "CreateThing response");

        Ok(ThingRegistration {
            thing_name: required(output.thing_name(), "CreateThing", "thingName")?,
            thing_arn: required(output.thing_arn(), "CreateThing", "thingArn")?,
            thing_id: required(output.thing_id(), "CreateThing", "thingId")?,
        })
    }

    async fn add_thing_to_group(&self, thing_name: &str, group: &str) -> ProvisionResult<()> {
        self.client
            .add_thing_to_thing_group()
            .thing_name(thing_name)
            .thing_group_name(group)
            .send()
            .await
            .map_err(|e| sdk_error("AddThingToThingGroup", e))?;
        Ok(())
    }

    async fn create_keys_and_certificate(&self) -> ProvisionResult<CredentialBundle> {
        let output = self
            .client
            .create_keys_and_certificate()
            .set_as_active(true)
            .send()
            .await
            .map_err(|e| sdk_error("CreateKeysAndCertificate", e))?;

        // The output carries the private key, so only identifiers are logged
        debug!(
            certificate_id = ?output.certificate_id(),
            certificate_arn = ?output.certificate_arn(),
            "CreateKeysAndCertificate response"
        );

        const OP: &str = "CreateKeysAndCertificate";
        let key_pair = output
            .key_pair()
            .ok_or(ProvisionError::MalformedResponse {
                operation: OP,
                field: "keyPair",
            })?;

        Ok(CredentialBundle {
            certificate_id: required(output.certificate_id(), OP, "certificateId")?,
            certificate_arn: required(output.certificate_arn(), OP, "certificateArn")?,
            certificate_pem: required(output.certificate_pem(), OP, "certificatePem")?,
            public_key: required(key_pair.public_key(), OP, "keyPair.PublicKey")?,
            private_key: required(key_pair.private_key(), OP, "keyPair.PrivateKey")?,
        })
    }

    async fn attach_policy(&self, policy_name: &str, certificate_arn: &str) -> ProvisionResult<()> {
        self.client
            .attach_policy()
            .policy_name(policy_name)
            .target(certificate_arn)
            .send()
            .await
            .map_err(|e| sdk_error("AttachPolicy", e))?;
        Ok(())
    }

    async fn attach_thing_principal(
        &self,
        thing_name: &str,
        certificate_arn: &str,
    ) -> ProvisionResult<()> {
        self.client
            .attach_thing_principal()
            .thing_name(thing_name)
            .principal(certificate_arn)
            .send()
            .await
            .map_err(|e| sdk_error("AttachThingPrincipal", e))?;
        Ok(())
    }

    async fn detach_thing_principal(
        &self,
        thing_name: &str,
        certificate_arn: &str,
    ) -> ProvisionResult<()> {
        self.client
            .detach_thing_principal()
            .thing_name(thing_name)
            .principal(certificate_arn)
            .send()
            .await
            .map_err(|e| sdk_error("DetachThingPrincipal", e))?;
        Ok(())
    }

    async fn detach_policy(&self, policy_name: &str, certificate_arn: &str) -> ProvisionResult<()> {
        self.client
            .detach_policy()
            .policy_name(policy_name)
            .target(certificate_arn)
            .send()
            .await
            .map_err(|e| sdk_error("DetachPolicy", e))?;
        Ok(())
    }

    async fn revoke_certificate(&self, certificate_id: &str) -> ProvisionResult<()> {
        // Active certificates cannot be deleted
        self.client
            .update_certificate()
            .certificate_id(certificate_id)
            .new_status(CertificateStatus::Inactive)
            .send()
            .await
            .map_err(|e| sdk_error("UpdateCertificate", e))?;

        self.client
            .delete_certificate()
            .certificate_id(certificate_id)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteCertificate", e))?;
        Ok(())
    }

    async fn remove_thing_from_group(&self, thing_name: &str, group: &str) -> ProvisionResult<()> {
        self.client
            .remove_thing_from_thing_group()
            .thing_name(thing_name)
            .thing_group_name(group)
            .send()
            .await
            .map_err(|e| sdk_error("RemoveThingFromThingGroup", e))?;
        Ok(())
    }

    async fn delete_thing(&self, thing_name: &str) -> ProvisionResult<()> {
        self.client
            .delete_thing()
            .thing_name(thing_name)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteThing", e))?;
        Ok(())
    }
}
