//! # Provisioning Workflow
//!
//! Runs the five provisioning steps for one device, in order:
//! 1. Register the thing and create the key directory
//! 2. Issue credentials, write them to disk, attach policy and thing
//! 3. Render the QR label
//! 4. Push the initial shadow
//! 5. Write the status row
//!
//! Every side effect that completes is recorded in a journal of undo
//! actions. When a step fails the journal is replayed in reverse, unless
//! rollback is disabled in the configuration.

use std::path::PathBuf;

use tracing::{error, info, info_span, warn, Instrument};

use shared::{
    config::ProvisionerConfig,
    error::{ProvisionError, ProvisionResult},
    types::{
        CredentialBundle, ProvisioningContext, ProvisioningReport, ProvisioningStep,
        ThingRegistration,
    },
};

use crate::credentials::CredentialStore;
use crate::label::LabelRenderer;
use crate::registry::DeviceRegistry;
use crate::shadow::{ShadowDocument, ShadowService};
use crate::status::{StatusRecord, StatusTable};

#[cfg(test)]
mod fakes;

/// Action undoing one completed side effect
#[derive(Debug, Clone, PartialEq, Eq)]
enum Compensation {
    DeleteThing {
        thing_name: String,
    },
    RemoveFromGroup {
        thing_name: String,
        group: String,
    },
    RemoveKeyDirectory {
        path: PathBuf,
    },
    RemoveLabel {
        path: PathBuf,
    },
    RevokeCertificate {
        certificate_id: String,
    },
    DetachPolicy {
        policy_name: String,
        certificate_arn: String,
    },
    DetachPrincipal {
        thing_name: String,
        certificate_arn: String,
    },
    DeleteShadow {
        thing_name: String,
        shadow_name: Option<String>,
    },
}

impl Compensation {
    fn name(&self) -> &'static str {
        match self {
            Compensation::DeleteThing { .. } => "delete_thing",
            Compensation::RemoveFromGroup { .. } => "remove_from_group",
            Compensation::RemoveKeyDirectory { .. } => "remove_key_directory",
            Compensation::RemoveLabel { .. } => "remove_label",
            Compensation::RevokeCertificate { .. } => "revoke_certificate",
            Compensation::DetachPolicy { .. } => "detach_policy",
            Compensation::DetachPrincipal { .. } => "detach_principal",
            Compensation::DeleteShadow { .. } => "delete_shadow",
        }
    }
}

type StepResult<T> = Result<T, (ProvisioningStep, ProvisionError)>;

/// Drives a provisioning run against a registry, shadow service and status table
pub struct Provisioner<R, S, T> {
    config: ProvisionerConfig,
    registry: R,
    shadows: S,
    status: T,
}

impl<R, S, T> Provisioner<R, S, T>
where
    R: DeviceRegistry,
    S: ShadowService,
    T: StatusTable,
{
    pub fn new(config: ProvisionerConfig, registry: R, shadows: S, status: T) -> Self {
        Self {
            config,
            registry,
            shadows,
            status,
        }
    }

    /// Context for a new device under the current configuration
    pub fn new_context(&self) -> ProvisioningContext {
        ProvisioningContext::generate(self.config.variant, self.config.thing_type())
    }

    /// Provision a new device with a freshly generated identifier
    pub async fn provision(&self) -> ProvisionResult<ProvisioningReport> {
        let ctx = self.new_context();
        self.run(&ctx).await
    }

    /// Provision the device described by `ctx`
    pub async fn run(&self, ctx: &ProvisioningContext) -> ProvisionResult<ProvisioningReport> {
        let span = info_span!(
            "provision",
            device_id = %ctx.device_id,
            variant = %ctx.variant
        );

        async move {
            info!(thing_type = %ctx.thing_type, "Starting device provisioning");

            let mut journal = Vec::new();
            match self.execute(ctx, &mut journal).await {
                Ok(report) => {
                    info!(
                        thing_arn = %report.thing.thing_arn,
                        certificate_id = %report.certificate_id,
                        "Device provisioned"
                    );
                    Ok(report)
                }
                Err((step, err)) => {
                    error!(
                        step = %step,
                        category = err.category(),
                        error = %err,
                        "Provisioning step failed"
                    );

                    if self.config.rollback_on_failure {
                        self.compensate(journal).await;
                    } else if !journal.is_empty() {
                        warn!(
                            pending = journal.len(),
                            "Rollback disabled, leaving partially provisioned device"
                        );
                    }

                    Err(ProvisionError::StepFailed {
                        step,
                        source: Box::new(err),
                    })
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        ctx: &ProvisioningContext,
        journal: &mut Vec<Compensation>,
    ) -> StepResult<ProvisioningReport> {
        let (thing, store) = self
            .register_identity(ctx, journal)
            .await
            .map_err(|e| (ProvisioningStep::RegisterIdentity, e))?;

        let bundle = self
            .issue_credentials(ctx, &thing, &store, journal)
            .await
            .map_err(|e| (ProvisioningStep::IssueCredentials, e))?;

        let label_path = self
            .generate_label(ctx, journal)
            .map_err(|e| (ProvisioningStep::GenerateLabel, e))?;

        self.update_shadow(ctx, journal)
            .await
            .map_err(|e| (ProvisioningStep::UpdateShadow, e))?;

        let status_table = self
            .write_status_record(ctx)
            .await
            .map_err(|e| (ProvisioningStep::WriteStatusRecord, e))?;

        Ok(ProvisioningReport {
            device_id: ctx.device_id.clone(),
            variant: ctx.variant,
            thing,
            certificate_id: bundle.certificate_id,
            key_dir: store.dir().to_path_buf(),
            label_path,
            device_auth: ctx.device_auth,
            status_table,
            created_at: ctx.created_at,
        })
    }

    // =========================================================================
    // STEPS
    // =========================================================================

    async fn register_identity(
        &self,
        ctx: &ProvisioningContext,
        journal: &mut Vec<Compensation>,
    ) -> ProvisionResult<(ThingRegistration, CredentialStore)> {
        let thing_name = ctx.device_id.as_str();

        let thing = self
            .registry
            .create_thing(thing_name, &ctx.thing_type)
            .await?;
        journal.push(Compensation::DeleteThing {
            thing_name: thing_name.to_string(),
        });

        if thing.thing_name != thing_name {
            return Err(ProvisionError::RegistryError {
                operation: "CreateThing",
                reason: format!(
                    "thing registered as '{}', expected '{}'",
                    thing.thing_name, thing_name
                ),
            });
        }

        info!(
            thing_arn = %thing.thing_arn,
            thing_id = %thing.thing_id,
            "Thing registered"
        );

        if let Some(group) = &self.config.registry.thing_group {
            self.registry.add_thing_to_group(thing_name, group).await?;
            journal.push(Compensation::RemoveFromGroup {
                thing_name: thing_name.to_string(),
                group: group.clone(),
            });
            info!(group = %group, "Thing added to group");
        }

        let store = CredentialStore::create(&self.config.output.key_dir).await?;
        journal.push(Compensation::RemoveKeyDirectory {
            path: store.dir().to_path_buf(),
        });

        Ok((thing, store))
    }

    async fn issue_credentials(
        &self,
        ctx: &ProvisioningContext,
        thing: &ThingRegistration,
        store: &CredentialStore,
        journal: &mut Vec<Compensation>,
    ) -> ProvisionResult<CredentialBundle> {
        let bundle = self.registry.create_keys_and_certificate().await?;
        journal.push(Compensation::RevokeCertificate {
            certificate_id: bundle.certificate_id.clone(),
        });
        info!(certificate_id = %bundle.certificate_id, "Certificate issued");

        store.write_bundle(&ctx.device_id, &bundle).await?;

        let policy_name = &self.config.registry.policy_name;
        self.registry
            .attach_policy(policy_name, &bundle.certificate_arn)
            .await?;
        journal.push(Compensation::DetachPolicy {
            policy_name: policy_name.clone(),
            certificate_arn: bundle.certificate_arn.clone(),
        });

        self.registry
            .attach_thing_principal(&thing.thing_name, &bundle.certificate_arn)
            .await?;
        journal.push(Compensation::DetachPrincipal {
            thing_name: thing.thing_name.clone(),
            certificate_arn: bundle.certificate_arn.clone(),
        });

        info!(policy = %policy_name, "Policy and thing attached to certificate");
        Ok(bundle)
    }

    fn generate_label(
        &self,
        ctx: &ProvisioningContext,
        journal: &mut Vec<Compensation>,
    ) -> ProvisionResult<PathBuf> {
        let path = LabelRenderer::new(&self.config.output.label_path).render(&ctx.device_id)?;
        journal.push(Compensation::RemoveLabel { path: path.clone() });
        Ok(path)
    }

    async fn update_shadow(
        &self,
        ctx: &ProvisioningContext,
        journal: &mut Vec<Compensation>,
    ) -> ProvisionResult<()> {
        let document = ShadowDocument::initial(ctx, &self.config.manufacturing);
        let shadow_name = ctx.variant.shadow_name();

        self.shadows
            .update_shadow(ctx.device_id.as_str(), shadow_name, document.to_payload()?)
            .await?;
        journal.push(Compensation::DeleteShadow {
            thing_name: ctx.device_id.to_string(),
            shadow_name: shadow_name.map(str::to_string),
        });

        info!(shadow = shadow_name.unwrap_or("classic"), "Shadow updated");
        Ok(())
    }

    async fn write_status_record(&self, ctx: &ProvisioningContext) -> ProvisionResult<String> {
        let record = StatusRecord::initial(
            ctx,
            self.config.status_table(),
            &self.config.manufacturing,
        );

        self.status.put_item(&record.table, &record.item).await?;

        info!(
            table = %record.table,
            key = ?record.key(),
            attributes = record.item.len(),
            "Status record written"
        );
        Ok(record.table)
    }

    // =========================================================================
    // ROLLBACK
    // =========================================================================

    /// Undo journal entries newest first; failures are logged and skipped
    async fn compensate(&self, journal: Vec<Compensation>) {
        info!(actions = journal.len(), "Rolling back partial provisioning");

        for action in journal.into_iter().rev() {
            let name = action.name();
            match self.undo(action).await {
                Ok(()) => info!(action = name, "Rolled back"),
                Err(e) => warn!(action = name, error = %e, "Rollback action failed"),
            }
        }
    }

    async fn undo(&self, action: Compensation) -> ProvisionResult<()> {
        match action {
            Compensation::DeleteThing { thing_name } => {
                self.registry.delete_thing(&thing_name).await
            }
            Compensation::RemoveFromGroup { thing_name, group } => {
                self.registry
                    .remove_thing_from_group(&thing_name, &group)
                    .await
            }
            Compensation::RemoveKeyDirectory { path } => {
                CredentialStore::open(path).remove().await
            }
            Compensation::RemoveLabel { path } => LabelRenderer::new(path).remove(),
            Compensation::RevokeCertificate { certificate_id } => {
                self.registry.revoke_certificate(&certificate_id).await
            }
            Compensation::DetachPolicy {
                policy_name,
                certificate_arn,
            } => {
                self.registry
                    .detach_policy(&policy_name, &certificate_arn)
                    .await
            }
            Compensation::DetachPrincipal {
                thing_name,
                certificate_arn,
            } => {
                self.registry
                    .detach_thing_principal(&thing_name, &certificate_arn)
                    .await
            }
            Compensation::DeleteShadow {
                thing_name,
                shadow_name,
            } => {
                self.shadows
                    .delete_shadow(&thing_name, shadow_name.as_deref())
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::FakeCloud;
    use super::*;
    use crate::status::StatusValue;
    use shared::types::{DeviceId, ProductVariant};
    use tempfile::{tempdir, TempDir};

    fn create_test_config(dir: &TempDir, variant: ProductVariant) -> ProvisionerConfig {
        let mut config = ProvisionerConfig::for_variant(variant);
        config.output.key_dir = dir.path().join("keys");
        config.output.label_path = dir.path().join("qrcode.png");
        config
    }

    fn provisioner(
        config: ProvisionerConfig,
        cloud: &FakeCloud,
    ) -> Provisioner<FakeCloud, FakeCloud, FakeCloud> {
        Provisioner::new(config, cloud.clone(), cloud.clone(), cloud.clone())
    }

    fn fixed_context(variant: ProductVariant) -> ProvisioningContext {
        ProvisioningContext::with_device_id(
            DeviceId::from("abc123"),
            variant,
            variant.thing_type(),
        )
    }

    #[tokio::test]
    async fn test_identifier_is_consistent_everywhere() {
        let dir = tempdir().unwrap();
        let cloud = FakeCloud::new();
        let provisioner = provisioner(create_test_config(&dir, ProductVariant::Logi2), &cloud);

        let ctx = fixed_context(ProductVariant::Logi2);
        let report = provisioner.run(&ctx).await.unwrap();
        assert_eq!(report.device_id.as_str(), "abc123");

        let state = cloud.state();

        // Registry
        assert!(state.things.contains_key("abc123"));
        assert_eq!(state.things["abc123"], "LOGI-2");
        let cert_arn = state.principals["abc123"].clone();
        assert_eq!(state.policies[&cert_arn], "default-logi-policy");

        // Credential files
        let keys = dir.path().join("keys");
        for name in [
            "abc123.public.key",
            "abc123.private.key",
            "abc123.cert.pem",
            "abc123.txt",
        ] {
            assert!(keys.join(name).exists(), "missing {}", name);
        }
        assert_eq!(
            std::fs::read_to_string(keys.join("abc123.txt")).unwrap(),
            "abc123"
        );

        // Shadow
        let shadow = &state.shadows[&("abc123".to_string(), None)];
        assert_eq!(shadow["state"]["reported"]["device_id"], "abc123");
        assert_eq!(shadow["state"]["reported"]["device_auth"], ctx.device_auth.unwrap());

        // Status row
        let rows = &state.tables["Centri_Main"];
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["PK"], StatusValue::from("DEV#abc123"));
        assert_eq!(rows[0]["SK"], StatusValue::from("STATUS#abc123"));
        assert_eq!(rows[0]["DeviceID"], StatusValue::from("abc123"));

        // Label
        assert!(report.label_path.exists());
    }

    #[tokio::test]
    async fn test_steps_run_in_order() {
        let dir = tempdir().unwrap();
        let cloud = FakeCloud::new();
        let provisioner = provisioner(create_test_config(&dir, ProductVariant::Logi2), &cloud);

        provisioner.run(&fixed_context(ProductVariant::Logi2)).await.unwrap();

        assert_eq!(
            cloud.calls(),
            [
                "CreateThing",
                "CreateKeysAndCertificate",
                "AttachPolicy",
                "AttachThingPrincipal",
                "UpdateThingShadow",
                "PutItem",
            ]
        );
    }

    #[tokio::test]
    async fn test_logi1_uses_named_shadow_and_own_table() {
        let dir = tempdir().unwrap();
        let cloud = FakeCloud::new();
        let provisioner = provisioner(create_test_config(&dir, ProductVariant::Logi1), &cloud);

        let report = provisioner.provision().await.unwrap();
        let id = report.device_id.to_string();
        assert_eq!(id.len(), 32);
        assert!(report.device_auth.is_none());
        assert_eq!(report.status_table, "logi-status");

        let state = cloud.state();
        assert_eq!(state.things[&id], "LOGI-1");

        let shadow = &state.shadows[&(id.clone(), Some("logi-1-shadow".to_string()))];
        assert_eq!(shadow["state"]["reported"]["id"], id.as_str());

        let rows = &state.tables["logi-status"];
        assert_eq!(rows[0]["id"], StatusValue::from(id.as_str()));
        assert_eq!(rows[0]["sim"], StatusValue::from("8944501705192074069"));
    }

    #[tokio::test]
    async fn test_second_run_fails_at_directory_creation() {
        let dir = tempdir().unwrap();
        let cloud = FakeCloud::new();
        let provisioner = provisioner(create_test_config(&dir, ProductVariant::Logi2), &cloud);

        let first = provisioner.provision().await.unwrap();
        let err = provisioner.provision().await.unwrap_err();

        assert_eq!(err.failed_step(), Some(ProvisioningStep::RegisterIdentity));
        assert!(matches!(err.root(), ProvisionError::KeyDirectoryExists(_)));

        // The second thing was rolled back, the first one is untouched
        let state = cloud.state();
        assert_eq!(state.things.len(), 1);
        assert!(state.things.contains_key(first.device_id.as_str()));
        assert!(dir
            .path()
            .join("keys")
            .join(format!("{}.cert.pem", first.device_id))
            .exists());
    }

    #[tokio::test]
    async fn test_shadow_failure_rolls_back_in_reverse() {
        let dir = tempdir().unwrap();
        let cloud = FakeCloud::failing_on("UpdateThingShadow");
        let mut config = create_test_config(&dir, ProductVariant::Logi2);
        config.registry.thing_group = Some("line-3".into());
        let provisioner = provisioner(config, &cloud);

        let err = provisioner
            .run(&fixed_context(ProductVariant::Logi2))
            .await
            .unwrap_err();
        assert_eq!(err.failed_step(), Some(ProvisioningStep::UpdateShadow));
        assert_eq!(err.category(), "shadow");

        assert_eq!(
            cloud.calls(),
            [
                "CreateThing",
                "AddThingToThingGroup",
                "CreateKeysAndCertificate",
                "AttachPolicy",
                "AttachThingPrincipal",
                "UpdateThingShadow",
                "DetachThingPrincipal",
                "DetachPolicy",
                "RevokeCertificate",
                "RemoveThingFromThingGroup",
                "DeleteThing",
            ]
        );

        let state = cloud.state();
        assert!(state.things.is_empty());
        assert!(state.certificates.is_empty());
        assert!(state.policies.is_empty());
        assert!(state.principals.is_empty());
        assert!(state.groups.is_empty());
        assert!(!dir.path().join("keys").exists());

        // A label for the deleted identity must not be left for printing
        assert!(!dir.path().join("qrcode.png").exists());
    }

    #[tokio::test]
    async fn test_status_failure_deletes_shadow() {
        let dir = tempdir().unwrap();
        let cloud = FakeCloud::failing_on("PutItem");
        let provisioner = provisioner(create_test_config(&dir, ProductVariant::Logi1), &cloud);

        let err = provisioner.provision().await.unwrap_err();
        assert_eq!(err.failed_step(), Some(ProvisioningStep::WriteStatusRecord));

        let state = cloud.state();
        assert!(state.shadows.is_empty());
        assert!(state.things.is_empty());
        assert!(state.tables.is_empty());
        assert!(!dir.path().join("qrcode.png").exists());
    }

    #[tokio::test]
    async fn test_no_rollback_leaves_partial_state() {
        let dir = tempdir().unwrap();
        let cloud = FakeCloud::failing_on("AttachPolicy");
        let mut config = create_test_config(&dir, ProductVariant::Logi2);
        config.rollback_on_failure = false;
        let provisioner = provisioner(config, &cloud);

        let err = provisioner
            .run(&fixed_context(ProductVariant::Logi2))
            .await
            .unwrap_err();
        assert_eq!(err.failed_step(), Some(ProvisioningStep::IssueCredentials));

        // Identity and files exist, but the certificate has no policy
        let state = cloud.state();
        assert!(state.things.contains_key("abc123"));
        assert_eq!(state.certificates.len(), 1);
        assert!(state.policies.is_empty());
        assert!(dir.path().join("keys").join("abc123.private.key").exists());
    }

    #[tokio::test]
    async fn test_failed_compensation_keeps_original_error() {
        let dir = tempdir().unwrap();
        let cloud = FakeCloud::failing_on_all(&["AttachThingPrincipal", "DeleteThing"]);
        let provisioner = provisioner(create_test_config(&dir, ProductVariant::Logi2), &cloud);

        let err = provisioner
            .run(&fixed_context(ProductVariant::Logi2))
            .await
            .unwrap_err();

        assert_eq!(err.failed_step(), Some(ProvisioningStep::IssueCredentials));
        match err.root() {
            ProvisionError::RegistryError { operation, .. } => {
                assert_eq!(*operation, "AttachThingPrincipal")
            }
            other => panic!("unexpected root error {:?}", other),
        }

        // Every other undo still ran
        let state = cloud.state();
        assert!(state.certificates.is_empty());
        assert!(state.things.contains_key("abc123"));
        assert!(!dir.path().join("keys").exists());
    }

    #[tokio::test]
    async fn test_renamed_thing_is_rejected() {
        let dir = tempdir().unwrap();
        let cloud = FakeCloud::new().renaming_things();
        let provisioner = provisioner(create_test_config(&dir, ProductVariant::Logi2), &cloud);

        let err = provisioner
            .run(&fixed_context(ProductVariant::Logi2))
            .await
            .unwrap_err();

        assert_eq!(err.failed_step(), Some(ProvisioningStep::RegisterIdentity));
        assert!(cloud.state().things.is_empty());
        assert!(!dir.path().join("keys").exists());
    }

    #[tokio::test]
    async fn test_device_auth_in_bounds_across_runs() {
        let cloud = FakeCloud::new();

        for _ in 0..20 {
            let dir = tempdir().unwrap();
            let provisioner =
                provisioner(create_test_config(&dir, ProductVariant::Logi2), &cloud);
            let report = provisioner.provision().await.unwrap();
            let code = report.device_auth.unwrap();
            assert!((100_000..=999_999).contains(&code));
        }
    }
}
