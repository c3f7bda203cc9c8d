//! CloudFormation registry catalog.
//!
//! Lists public resource types with `ListTypes` and fetches each schema with
//! `DescribeType`. Credentials and retries are whatever the AWS SDK defaults
//! provide.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::error::DisplayErrorContext;
use aws_sdk_cloudformation::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudformation::types::{RegistryType, Visibility};
use log::{debug, warn};

use super::SchemaCatalog;
use crate::errors::{Result, TrackerError};
use crate::types::{DeprecationStatus, FetchedType, ProviderMetadata, Timestamp};

/// [`SchemaCatalog`] over the CloudFormation registry API.
pub struct CloudFormationCatalog {
    client: Client,
}

impl CloudFormationCatalog {
    /// Connect using the default credential chain.
    ///
    /// `region` and `endpoint_url` override the SDK defaults when set
    /// (the endpoint override is mostly useful against LocalStack).
    pub async fn connect(region: Option<&str>, endpoint_url: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        if let Some(endpoint) = endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let config = loader.load().await;
        debug!(
            "CloudFormation client configured (region: {:?}, endpoint: {:?})",
            config.region().map(|r| r.as_ref().to_string()),
            endpoint_url
        );

        Self::with_client(Client::new(&config))
    }

    /// Create with an explicit client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SchemaCatalog for CloudFormationCatalog {
    async fn list_type_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;
        let mut previous_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_types()
                .visibility(Visibility::Public)
                .r#type(RegistryType::Resource)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|err| TrackerError::Listing {
                    message: DisplayErrorContext(&err).to_string(),
                })?;

            names.extend(
                page.type_summaries()
                    .iter()
                    .filter_map(|summary| summary.type_name())
                    .map(str::to_string),
            );

            match page.next_token() {
                Some(token) if !token.is_empty() => {
                    if previous_token.as_deref() == Some(token) {
                        return Err(TrackerError::Listing {
                            message: format!("ListTypes repeated pagination token '{token}'"),
                        });
                    }
                    previous_token = Some(token.to_string());
                    next_token = previous_token.clone();
                }
                _ => break,
            }
        }

        Ok(names)
    }

    async fn describe_type(&self, type_name: &str) -> Result<FetchedType> {
        let response = self
            .client
            .describe_type()
            .r#type(RegistryType::Resource)
            .type_name(type_name)
            .send()
            .await
            .map_err(|err| TrackerError::Describe {
                type_name: type_name.to_string(),
                message: DisplayErrorContext(&err).to_string(),
            })?;

        let raw_schema = response.schema().ok_or_else(|| TrackerError::Describe {
            type_name: type_name.to_string(),
            message: "response did not include a schema".to_string(),
        })?;
        let schema =
            serde_json::from_str(raw_schema).map_err(|source| TrackerError::InvalidSchema {
                type_name: type_name.to_string(),
                source,
            })?;

        let deprecation_status = response.deprecated_status().map(|status| {
            let parsed = DeprecationStatus::from_provider(status.as_str());
            if let DeprecationStatus::Other(value) = &parsed {
                warn!("Unknown deprecation status '{value}' for {type_name}");
            }
            parsed
        });

        Ok(FetchedType {
            type_name: type_name.to_string(),
            schema,
            metadata: ProviderMetadata {
                time_created: response.time_created().and_then(to_timestamp),
                deprecation_status,
            },
        })
    }
}

fn to_timestamp(value: &AwsDateTime) -> Option<Timestamp> {
    Timestamp::from_unix(value.secs(), value.subsec_nanos())
}
