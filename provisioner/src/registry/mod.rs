//! # Device Registry
//!
//! The IoT registry operations a provisioning run needs:
//! 1. Register the thing
//! 2. Issue an active certificate and key pair
//! 3. Attach the policy to the certificate
//! 4. Bind the certificate to the thing
//!
//! Each forward operation has an undo counterpart used when a later step
//! fails.

use async_trait::async_trait;

use shared::{
    error::ProvisionResult,
    types::{CredentialBundle, ThingRegistration},
};

/// Operations against the IoT device registry
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Register a thing of the given type
    async fn create_thing(
        &self,
        thing_name: &str,
        thing_type: &str,
    ) -> ProvisionResult<ThingRegistration>;

    /// Add a thing to a thing group
    async fn add_thing_to_group(&self, thing_name: &str, group: &str) -> ProvisionResult<()>;

    /// Issue a new key pair and an active certificate
    async fn create_keys_and_certificate(&self) -> ProvisionResult<CredentialBundle>;

    /// Attach a named policy to a certificate
    async fn attach_policy(&self, policy_name: &str, certificate_arn: &str) -> ProvisionResult<()>;

    /// Bind a certificate to a thing
    async fn attach_thing_principal(
        &self,
        thing_name: &str,
        certificate_arn: &str,
    ) -> ProvisionResult<()>;

    async fn detach_thing_principal(
        &self,
        thing_name: &str,
        certificate_arn: &str,
    ) -> ProvisionResult<()>;

    async fn detach_policy(&self, policy_name: &str, certificate_arn: &str) -> ProvisionResult<()>;

    /// Deactivate and delete a certificate
    async fn revoke_certificate(&self, certificate_id: &str) -> ProvisionResult<()>;

    async fn remove_thing_from_group(&self, thing_name: &str, group: &str) -> ProvisionResult<()>;

    async fn delete_thing(&self, thing_name: &str) -> ProvisionResult<()>;
}
