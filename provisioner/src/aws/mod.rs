//! # AWS Service Clients
//!
//! Implementations of the registry, shadow and status table seams on top of
//! the AWS SDK:
//! - [`IotRegistry`]: AWS IoT control plane
//! - [`IotShadowService`]: AWS IoT data plane
//! - [`DynamoStatusTable`]: DynamoDB
//!
//! All clients share one SDK configuration loaded for the configured region.

mod dynamodb;
mod iot;
mod shadow;

pub use dynamodb::DynamoStatusTable;
pub use iot::IotRegistry;
pub use shadow::IotShadowService;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::{debug, info};

use shared::{
    config::AwsConfig,
    constants::IOT_DATA_ENDPOINT_TYPE,
    error::{ProvisionError, ProvisionResult},
};

/// The three AWS-backed services used by a provisioning run
pub struct AwsServices {
    pub registry: IotRegistry,
    pub shadows: IotShadowService,
    pub status: DynamoStatusTable,
}

impl AwsServices {
    /// Load credentials and build the service clients
    pub async fn connect(config: &AwsConfig) -> ProvisionResult<Self> {
        let sdk_config = load_sdk_config(&config.region).await;

        let iot = aws_sdk_iot::Client::new(&sdk_config);

        let data_endpoint = match &config.data_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => discover_data_endpoint(&iot).await?,
        };
        info!(
            region = %config.region,
            data_endpoint = %data_endpoint,
            "AWS clients configured"
        );

        let data_plane_config = aws_sdk_iotdataplane::config::Builder::from(&sdk_config)
            .endpoint_url(endpoint_url(&data_endpoint))
            .build();

        Ok(Self {
            registry: IotRegistry::new(iot),
            shadows: IotShadowService::new(aws_sdk_iotdataplane::Client::from_conf(
                data_plane_config,
            )),
            status: DynamoStatusTable::new(aws_sdk_dynamodb::Client::new(&sdk_config)),
        })
    }
}

async fn load_sdk_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

/// Account-specific ATS endpoint of the IoT data plane
async fn discover_data_endpoint(iot: &aws_sdk_iot::Client) -> ProvisionResult<String> {
    let output = iot
        .describe_endpoint()
        .endpoint_type(IOT_DATA_ENDPOINT_TYPE)
        .send()
        .await
        .map_err(|e| sdk_error("DescribeEndpoint", e))?;

    let address = output
        .endpoint_address()
        .ok_or(ProvisionError::MalformedResponse {
            operation: "DescribeEndpoint",
            field: "endpointAddress",
        })?;

    debug!(endpoint = %address, "Discovered IoT data endpoint");
    Ok(address.to_string())
}

fn endpoint_url(endpoint: &str) -> String {
    if endpoint.starts_with("https://") || endpoint.starts_with("http://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    }
}

/// Registry error carrying the full SDK error chain
pub(crate) fn sdk_error<E>(operation: &'static str, err: E) -> ProvisionError
where
    E: std::error::Error,
{
    ProvisionError::RegistryError {
        operation,
        reason: error_chain(err),
    }
}

pub(crate) fn error_chain<E>(err: E) -> String
where
    E: std::error::Error,
{
    aws_sdk_iot::error::DisplayErrorContext(err).to_string()
}
