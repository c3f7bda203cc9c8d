//! schemaledger core library.
//!
//! Fetches the CloudFormation resource schema catalog, reconciles it against
//! an on-disk snapshot, and keeps the `version_metadata.json` /
//! `removed_schemas.json` ledgers current. Git history of the snapshot is the
//! version log; this crate never commits.

pub mod catalog;
pub mod config;
pub mod errors;
pub mod history;
pub mod reconcile;
pub mod run;
pub mod store;
pub mod types;

pub use catalog::{
    CatalogFetch, CloudFormationCatalog, FetchFailure, FetchOptions, MockCatalog, SchemaCatalog,
    fetch_catalog,
};
pub use config::{TrackerConfig, TrackerContext};
pub use errors::{Result, TrackerError};
pub use reconcile::{
    ChangeKind, CollapseGuard, ReappearPolicy, ReconcileOptions, Reconciliation, TypeChange,
    reconcile,
};
pub use run::{RunOptions, RunReport, run_sync};
pub use store::{Snapshot, SnapshotStore, StoreLayout};
pub use types::{
    ActiveLedger, DeprecationStatus, FetchedType, ProviderMetadata, RemovedLedger, RemovedRecord,
    Timestamp, VersionRecord,
};
