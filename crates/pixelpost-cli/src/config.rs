//! Configuration file loading for the command-line driver.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use pixelpost_core::{FileStore, MemoryStore, ObjectStore, PipelineConfig};
use serde::{Deserialize, Serialize};

/// Bucket used when neither the file nor the flags name one.
pub const DEFAULT_BUCKET: &str = "asdf";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub store: StoreConfig,
}

/// Where encoded variants are sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Keep objects in memory for the lifetime of the process.
    Memory { bucket: String },
    /// Write objects under `root/bucket/`.
    Filesystem { root: PathBuf, bucket: String },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory {
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn bucket(&self) -> &str {
        match self {
            StoreConfig::Memory { bucket } | StoreConfig::Filesystem { bucket, .. } => bucket,
        }
    }

    /// Point the store at a local directory, keeping the bucket name.
    pub fn into_filesystem(self, root: PathBuf) -> Self {
        StoreConfig::Filesystem {
            root,
            bucket: self.bucket().to_string(),
        }
    }

    pub fn with_bucket(self, bucket: String) -> Self {
        match self {
            StoreConfig::Memory { .. } => StoreConfig::Memory { bucket },
            StoreConfig::Filesystem { root, .. } => StoreConfig::Filesystem { root, bucket },
        }
    }

    pub fn build(&self) -> Arc<dyn ObjectStore> {
        match self {
            StoreConfig::Memory { bucket } => Arc::new(MemoryStore::new(bucket.clone())),
            StoreConfig::Filesystem { root, bucket } => {
                Arc::new(FileStore::new(root.clone(), bucket.clone()))
            }
        }
    }
}

/// Parse configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(content).context("Failed to parse config")?;
    config
        .pipeline
        .validate()
        .context("Invalid pipeline configuration")?;
    Ok(config)
}

/// Load the config file if one was given, otherwise use defaults.
pub fn load_config_or_default(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config = parse_config(&content)?;
            tracing::info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        None => {
            tracing::debug!("No config file given, using defaults");
            Ok(AppConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
            [pipeline]
            width = 640
            height = 480
            object_stem = "cover"

            [store]
            backend = "filesystem"
            root = "/var/lib/pixelpost"
            bucket = "media"
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.width, 640);
        assert_eq!(config.pipeline.object_stem, "cover");
        assert_eq!(
            config.store,
            StoreConfig::Filesystem {
                root: PathBuf::from("/var/lib/pixelpost"),
                bucket: "media".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(parse_config("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_invalid_pipeline_rejected() {
        let result = parse_config("[pipeline]\nwidth = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_store_overrides() {
        let store = StoreConfig::default()
            .with_bucket("images".to_string())
            .into_filesystem(PathBuf::from("out"));
        assert_eq!(
            store,
            StoreConfig::Filesystem {
                root: PathBuf::from("out"),
                bucket: "images".to_string(),
            }
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixelpost.toml");
        std::fs::write(&path, "[store]\nbackend = \"memory\"\nbucket = \"b\"\n").unwrap();

        let config = load_config_or_default(Some(&path)).unwrap();
        assert_eq!(config.store.bucket(), "b");

        assert!(load_config_or_default(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
