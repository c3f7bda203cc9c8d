//! Configuration stored in `schemaledger.toml` at the snapshot root.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::FetchOptions;
use crate::errors::{Result, TrackerError};
use crate::reconcile::{CollapseGuard, ReappearPolicy, ReconcileOptions};
use crate::store::StoreLayout;

pub const CONFIG_FILE_NAME: &str = "schemaledger.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub tracker: TrackerSettings,
    #[serde(default)]
    pub guard: GuardSettings,
    #[serde(default)]
    pub aws: AwsSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSettings {
    #[serde(default = "default_schemas_dir")]
    pub schemas_dir: String,
    #[serde(default = "default_version_file")]
    pub version_file: String,
    #[serde(default = "default_removed_file")]
    pub removed_file: String,
    #[serde(default = "default_type_prefix")]
    pub type_prefix: String,
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
    #[serde(default)]
    pub reappear_policy: ReappearPolicy,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            schemas_dir: default_schemas_dir(),
            version_file: default_version_file(),
            removed_file: default_removed_file(),
            type_prefix: default_type_prefix(),
            progress_interval: default_progress_interval(),
            reappear_policy: ReappearPolicy::default(),
        }
    }
}

fn default_schemas_dir() -> String {
    "schemas".to_string()
}

fn default_version_file() -> String {
    "version_metadata.json".to_string()
}

fn default_removed_file() -> String {
    "removed_schemas.json".to_string()
}

fn default_type_prefix() -> String {
    "AWS::".to_string()
}

fn default_progress_interval() -> usize {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardSettings {
    #[serde(default = "default_max_removal_ratio")]
    pub max_removal_ratio: f64,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            max_removal_ratio: default_max_removal_ratio(),
        }
    }
}

fn default_max_removal_ratio() -> f64 {
    0.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsSettings {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
}

impl Default for AwsSettings {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint_url: None,
        }
    }
}

fn default_region() -> String {
    "${AWS_REGION}".to_string()
}

impl AwsSettings {
    /// Region with `${VAR}` expanded; `None` lets the SDK pick its default.
    pub fn resolved_region(&self) -> Option<String> {
        expand_env(&self.region)
    }

    pub fn resolved_endpoint_url(&self) -> Option<String> {
        self.endpoint_url.as_deref().and_then(expand_env)
    }
}

/// Expand a whole-value `${VAR}` reference. Unset or empty values yield `None`.
fn expand_env(raw: &str) -> Option<String> {
    let value = match raw
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    {
        Some(var_name) => std::env::var(var_name).ok()?,
        None => raw.to_string(),
    };
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Snapshot root plus its loaded configuration.
pub struct TrackerContext {
    /// Directory holding the snapshot (usually the git checkout).
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub config: TrackerConfig,
    /// Whether `config` came from a file rather than defaults.
    pub config_loaded: bool,
}

impl TrackerContext {
    /// Load context for `root`, falling back to defaults when no config file exists.
    pub fn from_root(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config_path = root.join(CONFIG_FILE_NAME);

        let (config, config_loaded) = if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|err| TrackerError::Config {
                    message: format!("failed to read {}: {err}", config_path.display()),
                })?;
            let config: TrackerConfig =
                toml::from_str(&content).map_err(|err| TrackerError::Config {
                    message: format!("failed to parse {}: {err}", config_path.display()),
                })?;
            (config, true)
        } else {
            (TrackerConfig::default(), false)
        };

        validate(&config)?;

        Ok(Self {
            root,
            config_path,
            config,
            config_loaded,
        })
    }

    /// Write the default configuration file. Refuses to overwrite an existing one.
    pub fn write_default_config(root: &Path) -> Result<PathBuf> {
        let config_path = root.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Err(TrackerError::Config {
                message: format!("{} already exists", config_path.display()),
            });
        }

        let rendered =
            toml::to_string_pretty(&TrackerConfig::default()).map_err(|err| {
                TrackerError::Config {
                    message: format!("failed to render default config: {err}"),
                }
            })?;
        std::fs::write(&config_path, rendered)
            .map_err(|err| TrackerError::io(&config_path, err))?;
        Ok(config_path)
    }

    pub fn layout(&self) -> StoreLayout {
        let settings = &self.config.tracker;
        StoreLayout {
            schemas_dir: self.root.join(&settings.schemas_dir),
            version_file: self.root.join(&settings.version_file),
            removed_file: self.root.join(&settings.removed_file),
        }
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            type_prefix: self.config.tracker.type_prefix.clone(),
            progress_interval: self.config.tracker.progress_interval,
        }
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            reappear_policy: self.config.tracker.reappear_policy,
            guard: CollapseGuard {
                max_removal_ratio: self.config.guard.max_removal_ratio,
                enabled: true,
            },
        }
    }
}

fn validate(config: &TrackerConfig) -> Result<()> {
    let ratio = config.guard.max_removal_ratio;
    if !(0.0..=1.0).contains(&ratio) {
        return Err(TrackerError::Config {
            message: format!("guard.max_removal_ratio must be between 0 and 1, got {ratio}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();
        assert_eq!(config.tracker.schemas_dir, "schemas");
        assert_eq!(config.tracker.version_file, "version_metadata.json");
        assert_eq!(config.tracker.removed_file, "removed_schemas.json");
        assert_eq!(config.tracker.type_prefix, "AWS::");
        assert_eq!(config.tracker.reappear_policy, ReappearPolicy::Fresh);
        assert_eq!(config.aws.region, "${AWS_REGION}");
    }

    #[test]
    fn test_config_serialization() {
        let config = TrackerConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("schemas_dir"));
        assert!(toml_str.contains("max_removal_ratio"));
        assert!(toml_str.contains("reappear_policy = \"fresh\""));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: TrackerConfig = toml::from_str(
            r#"
            [tracker]
            reappear_policy = "restore"
            "#,
        )
        .unwrap();
        assert_eq!(config.tracker.reappear_policy, ReappearPolicy::Restore);
        assert_eq!(config.tracker.progress_interval, 100);
        assert_eq!(config.guard.max_removal_ratio, 0.5);
    }

    #[test]
    fn test_context_rejects_bad_ratio() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[guard]\nmax_removal_ratio = 1.5\n",
        )
        .unwrap();
        assert!(TrackerContext::from_root(dir.path()).is_err());
    }

    #[test]
    fn test_write_default_config_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = TrackerContext::write_default_config(dir.path()).unwrap();
        assert!(path.exists());
        assert!(TrackerContext::write_default_config(dir.path()).is_err());

        let ctx = TrackerContext::from_root(dir.path()).unwrap();
        assert!(ctx.config_loaded);
        assert_eq!(ctx.layout(), StoreLayout::under(dir.path()));
    }

    #[test]
    #[serial]
    fn test_region_expansion() {
        let settings = AwsSettings::default();
        unsafe { std::env::set_var("AWS_REGION", "eu-west-1") };
        assert_eq!(settings.resolved_region().as_deref(), Some("eu-west-1"));
        unsafe { std::env::remove_var("AWS_REGION") };
        assert_eq!(settings.resolved_region(), None);

        let literal = AwsSettings {
            region: "us-east-2".to_string(),
            endpoint_url: Some("http://localhost:4566".to_string()),
        };
        assert_eq!(literal.resolved_region().as_deref(), Some("us-east-2"));
        assert_eq!(
            literal.resolved_endpoint_url().as_deref(),
            Some("http://localhost:4566")
        );
    }
}
