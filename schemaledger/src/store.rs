//! On-disk snapshot: one JSON document per resource type plus the two ledgers.
//!
//! Every write goes to a temporary file in the target directory and is then
//! renamed over the destination, so an interrupted run never leaves a
//! half-written file behind. There is no cross-file atomicity; the git commit
//! made after a run is what groups the changes.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::errors::{Result, TrackerError};
use crate::types::{ActiveLedger, RemovedLedger};

const SEGMENT_SEPARATOR: &str = "::";
const FILE_SEGMENT_SEPARATOR: &str = "--";
const SCHEMA_EXTENSION: &str = ".json";

/// Where the snapshot lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub schemas_dir: PathBuf,
    pub version_file: PathBuf,
    pub removed_file: PathBuf,
}

impl StoreLayout {
    /// Conventional layout under `root`.
    pub fn under(root: &Path) -> Self {
        Self {
            schemas_dir: root.join("schemas"),
            version_file: root.join("version_metadata.json"),
            removed_file: root.join("removed_schemas.json"),
        }
    }
}

/// Previously persisted state handed to the reconciler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Stored documents, keyed by type name.
    pub documents: BTreeMap<String, Value>,
    pub active: ActiveLedger,
    pub removed: RemovedLedger,
}

/// Map `AWS::S3::Bucket` to `AWS--S3--Bucket.json`.
///
/// Only segments of ASCII alphanumerics and `_` joined by `::` are accepted,
/// which keeps the mapping injective.
pub fn schema_file_name(type_name: &str) -> Result<String> {
    let valid = !type_name.is_empty()
        && type_name.split(SEGMENT_SEPARATOR).all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if !valid {
        return Err(TrackerError::InvalidTypeName {
            type_name: type_name.to_string(),
        });
    }
    Ok(format!(
        "{}{SCHEMA_EXTENSION}",
        type_name.replace(SEGMENT_SEPARATOR, FILE_SEGMENT_SEPARATOR)
    ))
}

/// Inverse of [`schema_file_name`]; `None` for files that are not schema documents.
pub fn type_name_from_file_name(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(SCHEMA_EXTENSION)?;
    let type_name = stem.replace(FILE_SEGMENT_SEPARATOR, SEGMENT_SEPARATOR);
    schema_file_name(&type_name).ok()?;
    Some(type_name)
}

/// Reads and writes the snapshot files.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    layout: StoreLayout,
}

impl SnapshotStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Path of the document file for a type.
    pub fn document_path(&self, type_name: &str) -> Result<PathBuf> {
        Ok(self.layout.schemas_dir.join(schema_file_name(type_name)?))
    }

    pub fn load_document(&self, type_name: &str) -> Result<Option<Value>> {
        let path = self.document_path(type_name)?;
        read_json_if_exists(&path)
    }

    pub fn save_document(&self, type_name: &str, document: &Value) -> Result<()> {
        let path = self.document_path(type_name)?;
        write_json_atomic(&path, document)
    }

    /// Type names that have a stored document, sorted.
    pub fn list_documents(&self) -> Result<Vec<String>> {
        let dir = &self.layout.schemas_dir;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(dir).map_err(|err| TrackerError::io(dir, err))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| TrackerError::io(dir, err))?;
            if let Some(type_name) = entry
                .file_name()
                .to_str()
                .and_then(type_name_from_file_name)
            {
                names.push(type_name);
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn load_active_ledger(&self) -> Result<ActiveLedger> {
        Ok(read_json_if_exists(&self.layout.version_file)?.unwrap_or_default())
    }

    pub fn load_removed_ledger(&self) -> Result<RemovedLedger> {
        Ok(read_json_if_exists(&self.layout.removed_file)?.unwrap_or_default())
    }

    pub fn save_active_ledger(&self, ledger: &ActiveLedger) -> Result<()> {
        write_json_atomic(&self.layout.version_file, ledger)
    }

    pub fn save_removed_ledger(&self, ledger: &RemovedLedger) -> Result<()> {
        write_json_atomic(&self.layout.removed_file, ledger)
    }

    /// Load both ledgers and the stored documents for `type_names`.
    ///
    /// Types without a document are simply absent from `documents`.
    pub fn load_snapshot<'a, I>(&self, type_names: I) -> Result<Snapshot>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut documents = BTreeMap::new();
        for type_name in type_names {
            if let Some(document) = self.load_document(type_name)? {
                documents.insert(type_name.to_string(), document);
            }
        }

        Ok(Snapshot {
            documents,
            active: self.load_active_ledger()?,
            removed: self.load_removed_ledger()?,
        })
    }
}

fn read_json_if_exists<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(TrackerError::io(path, err)),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|err| TrackerError::json(path, err))
}

/// Serialize with sorted keys and two-space indentation, then rename into place.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    // Going through `Value` sorts object keys, flattened structs included.
    let value = serde_json::to_value(value).map_err(|err| TrackerError::json(path, err))?;
    let mut rendered =
        serde_json::to_string_pretty(&value).map_err(|err| TrackerError::json(path, err))?;
    rendered.push('\n');

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|err| TrackerError::io(dir, err))?;

    let mut temp = NamedTempFile::new_in(dir).map_err(|err| TrackerError::io(dir, err))?;
    temp.write_all(rendered.as_bytes())
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|err| TrackerError::io(temp.path(), err))?;
    temp.persist(path)
        .map_err(|err| TrackerError::io(path, err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_file_name() {
        assert_eq!(
            schema_file_name("AWS::S3::Bucket").unwrap(),
            "AWS--S3--Bucket.json"
        );
        assert_eq!(
            schema_file_name("AWS::EC2::VPC_Endpoint").unwrap(),
            "AWS--EC2--VPC_Endpoint.json"
        );
    }

    #[test]
    fn test_schema_file_name_rejects_ambiguous_names() {
        for bad in ["", "AWS::", "AWS:::S3", "AWS::S3--Bucket", "AWS/S3", "../etc"] {
            assert!(schema_file_name(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_type_name_from_file_name() {
        assert_eq!(
            type_name_from_file_name("AWS--Lambda--Function.json").as_deref(),
            Some("AWS::Lambda::Function")
        );
        assert_eq!(type_name_from_file_name("README.md"), None);
        assert_eq!(type_name_from_file_name(".tmpX1y2.json"), None);
    }
}
