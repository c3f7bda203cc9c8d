//! Catalog fetcher: lists resource types and retrieves each schema.
//!
//! The provider sits behind [`SchemaCatalog`] so the fetch loop and everything
//! downstream can run against [`MockCatalog`] in tests.

mod cloudformation;
mod mock;

use std::collections::BTreeSet;

use async_trait::async_trait;
use log::{info, warn};
use serde::Serialize;

use crate::errors::Result;
use crate::store::schema_file_name;
use crate::types::FetchedType;

pub use cloudformation::CloudFormationCatalog;
pub use mock::MockCatalog;

/// Provider catalog of resource-type schemas.
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    /// Every resource type name in the catalog, across all pages.
    async fn list_type_names(&self) -> Result<Vec<String>>;

    /// Schema document and provider metadata for one type.
    async fn describe_type(&self, type_name: &str) -> Result<FetchedType>;
}

/// Knobs for [`fetch_catalog`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Only names starting with this prefix are tracked. Empty tracks everything.
    pub type_prefix: String,
    /// Log a progress line every N described types. Zero disables it.
    pub progress_interval: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            type_prefix: "AWS::".to_string(),
            progress_interval: 100,
        }
    }
}

/// A type that was listed but could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub type_name: String,
    pub message: String,
}

/// Result of one pass over the catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogFetch {
    /// Every tracked name the provider listed, fetched or not.
    pub listed: BTreeSet<String>,
    /// Successfully described types, in name order.
    pub fetched: Vec<FetchedType>,
    pub failures: Vec<FetchFailure>,
}

impl CatalogFetch {
    /// Build directly from fetched types, all of them counted as listed.
    pub fn from_fetched(fetched: Vec<FetchedType>) -> Self {
        Self {
            listed: fetched.iter().map(|t| t.type_name.clone()).collect(),
            fetched,
            failures: Vec::new(),
        }
    }
}

/// List the catalog and describe every tracked type, one at a time.
///
/// A listing failure is returned as an error, as is any describe error that is
/// not [per-item](crate::TrackerError::is_per_item). A per-item failure is
/// logged and recorded in [`CatalogFetch::failures`]; the type stays in
/// `listed` so it is not mistaken for a removal.
pub async fn fetch_catalog(
    catalog: &dyn SchemaCatalog,
    options: &FetchOptions,
) -> Result<CatalogFetch> {
    let listed: BTreeSet<String> = catalog
        .list_type_names()
        .await?
        .into_iter()
        .filter(|name| name.starts_with(&options.type_prefix))
        .collect();

    info!("Found {} resource types", listed.len());

    let mut fetched = Vec::with_capacity(listed.len());
    let mut failures = Vec::new();

    for (index, type_name) in listed.iter().enumerate() {
        let outcome = match schema_file_name(type_name) {
            Ok(_) => catalog.describe_type(type_name).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(fetched_type) => fetched.push(fetched_type),
            Err(err) if err.is_per_item() => {
                warn!("Error with {type_name}: {err}");
                failures.push(FetchFailure {
                    type_name: type_name.clone(),
                    message: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }

        let processed = index + 1;
        if options.progress_interval > 0 && processed % options.progress_interval == 0 {
            info!("Processed {processed}/{} schemas...", listed.len());
        }
    }

    Ok(CatalogFetch {
        listed,
        fetched,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_fetch_filters_by_prefix() {
        let catalog = MockCatalog::new()
            .with_type("AWS::S3::Bucket", json!({"typeName": "AWS::S3::Bucket"}))
            .with_type("Acme::Widget::Thing", json!({"typeName": "Acme::Widget::Thing"}));

        let fetch = fetch_catalog(&catalog, &FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(fetch.listed.len(), 1);
        assert!(fetch.listed.contains("AWS::S3::Bucket"));
        assert_eq!(fetch.fetched.len(), 1);
        assert!(fetch.failures.is_empty());
    }

    #[tokio::test]
    async fn test_describe_failure_is_skipped_not_fatal() {
        let catalog = MockCatalog::new()
            .with_type("AWS::S3::Bucket", json!({}))
            .with_failing_type("AWS::SQS::Queue", "throttled");

        let fetch = fetch_catalog(&catalog, &FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(fetch.fetched.len(), 1);
        assert_eq!(fetch.failures.len(), 1);
        assert_eq!(fetch.failures[0].type_name, "AWS::SQS::Queue");
        assert!(fetch.failures[0].message.contains("throttled"));
        assert!(fetch.listed.contains("AWS::SQS::Queue"));
    }

    #[tokio::test]
    async fn test_listing_failure_is_fatal() {
        let catalog = MockCatalog::new()
            .with_type("AWS::S3::Bucket", json!({}))
            .with_listing_error("access denied");

        let err = fetch_catalog(&catalog, &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("access denied"));
    }

    #[tokio::test]
    async fn test_unmappable_name_is_recorded_as_failure() {
        let catalog = MockCatalog::new().with_type("AWS::Bad--Name", json!({}));

        let fetch = fetch_catalog(&catalog, &FetchOptions::default())
            .await
            .unwrap();

        assert!(fetch.fetched.is_empty());
        assert_eq!(fetch.failures.len(), 1);
        assert_eq!(catalog.describe_calls(), 0);
    }
}
