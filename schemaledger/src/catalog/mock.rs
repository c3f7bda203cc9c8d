//! In-memory catalog for tests and local experiments.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use super::SchemaCatalog;
use crate::errors::{Result, TrackerError};
use crate::types::{FetchedType, ProviderMetadata};

/// Catalog backed by a map. Types can be made to fail individually, and the
/// listing itself can be made to fail.
#[derive(Debug, Default)]
pub struct MockCatalog {
    types: BTreeMap<String, FetchedType>,
    failing: BTreeMap<String, String>,
    listing_error: Option<String>,
    describe_calls: AtomicUsize,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(self, type_name: &str, schema: Value) -> Self {
        self.with_type_metadata(type_name, schema, ProviderMetadata::default())
    }

    pub fn with_type_metadata(
        mut self,
        type_name: &str,
        schema: Value,
        metadata: ProviderMetadata,
    ) -> Self {
        self.types.insert(
            type_name.to_string(),
            FetchedType {
                type_name: type_name.to_string(),
                schema,
                metadata,
            },
        );
        self
    }

    /// Listed, but every describe call fails with `message`.
    pub fn with_failing_type(mut self, type_name: &str, message: &str) -> Self {
        self.failing
            .insert(type_name.to_string(), message.to_string());
        self
    }

    pub fn with_listing_error(mut self, message: &str) -> Self {
        self.listing_error = Some(message.to_string());
        self
    }

    /// Number of describe calls served so far.
    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchemaCatalog for MockCatalog {
    async fn list_type_names(&self) -> Result<Vec<String>> {
        if let Some(message) = &self.listing_error {
            return Err(TrackerError::Listing {
                message: message.clone(),
            });
        }
        Ok(self
            .types
            .keys()
            .chain(self.failing.keys())
            .cloned()
            .collect())
    }

    async fn describe_type(&self, type_name: &str) -> Result<FetchedType> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.failing.get(type_name) {
            return Err(TrackerError::Describe {
                type_name: type_name.to_string(),
                message: message.clone(),
            });
        }
        self.types
            .get(type_name)
            .cloned()
            .ok_or_else(|| TrackerError::Describe {
                type_name: type_name.to_string(),
                message: "type not found".to_string(),
            })
    }
}
