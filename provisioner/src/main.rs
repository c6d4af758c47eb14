//! # Device Provisioner CLI
//!
//! Command-line tool run once per unit on the manufacturing line:
//! - Provision a new device (thing, certificate, label, shadow, status row)
//! - Show the credentials stored for a device
//! - Re-print a device label
//!
//! ## Usage
//!
//! ```bash
//! # Provision a second-generation unit
//! provisioner --variant logi-2 provision --sim 8944501705192074069 --imei 356938035643809 --serial 1042
//!
//! # Inspect the key directory of a run
//! provisioner show --id 3f2504e0-4f89-41d3-9a0c-0305e82c3301
//!
//! # Re-print a damaged label
//! provisioner label --id 3f2504e0-4f89-41d3-9a0c-0305e82c3301
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use provisioner::{AwsServices, CredentialStore, LabelRenderer, Provisioner};
use shared::{config::ProvisionerConfig, types::DeviceId};

#[derive(Parser)]
#[command(name = "provisioner")]
#[command(about = "Provision IoT devices on the manufacturing line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// AWS region
    #[arg(long, global = true)]
    region: Option<String>,

    /// Product line (logi-1, logi-2)
    #[arg(long, global = true)]
    variant: Option<String>,

    /// Log debug output, including registry responses
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision a new device
    Provision {
        /// Policy attached to the device certificate
        #[arg(long)]
        policy: Option<String>,

        /// Directory created for the credential files
        #[arg(long)]
        key_dir: Option<PathBuf>,

        /// Label image path
        #[arg(long)]
        label_path: Option<PathBuf>,

        /// Status table
        #[arg(long)]
        table: Option<String>,

        /// Registry thing type
        #[arg(long)]
        thing_type: Option<String>,

        /// Thing group to add the device to
        #[arg(long)]
        thing_group: Option<String>,

        /// SIM card id
        #[arg(long)]
        sim: Option<String>,

        /// Modem IMEI
        #[arg(long)]
        imei: Option<String>,

        /// Serial number
        #[arg(long)]
        serial: Option<String>,

        /// Distributor name
        #[arg(long)]
        provider: Option<String>,

        /// IoT data-plane endpoint (discovered when omitted)
        #[arg(long)]
        data_endpoint: Option<String>,

        /// Leave partial state behind when a step fails
        #[arg(long)]
        no_rollback: bool,
    },

    /// Show the credentials stored for a device
    Show {
        /// Device identifier
        #[arg(long)]
        id: String,

        /// Key directory
        #[arg(long)]
        key_dir: Option<PathBuf>,
    },

    /// Render the label of an existing device
    Label {
        /// Device identifier
        #[arg(long)]
        id: String,

        /// Label image path
        #[arg(long)]
        label_path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    // Build config
    let mut config = ProvisionerConfig::from_env()?;
    if let Some(region) = cli.region {
        config.aws.region = region;
    }
    if let Some(variant) = cli.variant {
        config.variant = variant.parse()?;
    }

    match cli.command {
        Commands::Provision {
            policy,
            key_dir,
            label_path,
            table,
            thing_type,
            thing_group,
            sim,
            imei,
            serial,
            provider,
            data_endpoint,
            no_rollback,
        } => {
            if let Some(policy) = policy {
                config.registry.policy_name = policy;
            }
            if let Some(key_dir) = key_dir {
                config.output.key_dir = key_dir;
            }
            if let Some(label_path) = label_path {
                config.output.label_path = label_path;
            }
            if table.is_some() {
                config.status_table = table;
            }
            if thing_type.is_some() {
                config.registry.thing_type = thing_type;
            }
            if thing_group.is_some() {
                config.registry.thing_group = thing_group;
            }
            if let Some(sim) = sim {
                config.manufacturing.sim = Some(sim);
            }
            if let Some(imei) = imei {
                config.manufacturing.imei = imei;
            }
            if let Some(serial) = serial {
                config.manufacturing.serial = serial;
            }
            if let Some(provider) = provider {
                config.manufacturing.provider = provider;
            }
            if data_endpoint.is_some() {
                config.aws.data_endpoint = data_endpoint;
            }
            if no_rollback {
                config.rollback_on_failure = false;
            }

            provision_device(config).await?;
        }
        Commands::Show { id, key_dir } => {
            let key_dir = key_dir.unwrap_or(config.output.key_dir);
            show_credentials(key_dir, &DeviceId::from(id)).await?;
        }
        Commands::Label { id, label_path } => {
            let label_path = label_path.unwrap_or(config.output.label_path);
            render_label(label_path, &DeviceId::from(id))?;
        }
    }

    Ok(())
}

async fn provision_device(config: ProvisionerConfig) -> Result<()> {
    config.validate()?;

    info!(
        version = shared::VERSION,
        variant = %config.variant,
        region = %config.aws.region,
        thing_type = %config.thing_type(),
        "Provisioning device"
    );

    let services = AwsServices::connect(&config.aws).await?;
    let provisioner = Provisioner::new(
        config,
        services.registry,
        services.shadows,
        services.status,
    );

    let report = provisioner.provision().await?;

    println!("\n✓ Device provisioned successfully!");
    println!("  Device ID: {}", report.device_id);
    println!("  Thing ARN: {}", report.thing.thing_arn);
    println!("  Certificate: {}", report.certificate_id);
    println!("  Keys: {}", report.key_dir.display());
    println!("  Label: {}", report.label_path.display());
    if let Some(code) = report.device_auth {
        println!("  Device auth: {}", code);
    }
    println!("  Status table: {}", report.status_table);

    Ok(())
}

async fn show_credentials(key_dir: PathBuf, device_id: &DeviceId) -> Result<()> {
    let stored = CredentialStore::open(key_dir).load(device_id).await?;

    println!("\nDevice Credentials:");
    println!("  Device ID: {}", stored.device_id);
    println!("  Certificate: {}", stored.files.certificate.display());
    println!("  Public key: {}", stored.files.public_key.display());
    println!(
        "  Private key: {} ({})",
        stored.files.private_key.display(),
        if stored.files.private_key.exists() {
            "present"
        } else {
            "missing"
        }
    );
    println!("  Certificate PEM: {} bytes", stored.certificate_pem.len());

    Ok(())
}

fn render_label(label_path: PathBuf, device_id: &DeviceId) -> Result<()> {
    let path = LabelRenderer::new(label_path).render(device_id)?;
    println!("\n✓ Label written to {}", path.display());
    Ok(())
}
