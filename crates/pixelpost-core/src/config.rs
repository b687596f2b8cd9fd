//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::Dimensions;

/// Width of the raw buffers the pipeline accepts unless configured otherwise.
pub const DEFAULT_WIDTH: u32 = 1248;
/// Height of the raw buffers the pipeline accepts unless configured otherwise.
pub const DEFAULT_HEIGHT: u32 = 344;
/// Object name every variant is stored under, before prefix and suffix.
pub const DEFAULT_OBJECT_STEM: &str = "asdf";

/// Errors from an invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("Object stem must not be empty")]
    EmptyObjectStem,

    #[error("Object stem '{0}' must not contain '/'")]
    StemContainsSeparator(String),

    #[error("max_workers must be at least 1")]
    ZeroWorkerLimit,
}

/// Settings shared by every batch a [`BatchExecutor`](crate::BatchExecutor) runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Width of every raw buffer, in pixels.
    pub width: u32,
    /// Height of every raw buffer, in pixels.
    pub height: u32,
    /// Deterministic object name placed between prefix and format suffix.
    pub object_stem: String,
    /// Upper bound on workers a single batch may allocate. A batch with more
    /// tasks than this cannot be scheduled. `None` means unbounded.
    pub max_workers: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            object_stem: DEFAULT_OBJECT_STEM.to_string(),
            max_workers: None,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.width = dimensions.width;
        self.height = dimensions.height;
        self
    }

    pub fn with_object_stem(mut self, stem: impl Into<String>) -> Self {
        self.object_stem = stem.into();
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers);
        self
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// Check the configuration for values no batch could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ZeroDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.object_stem.is_empty() {
            return Err(ConfigError::EmptyObjectStem);
        }
        if self.object_stem.contains('/') {
            return Err(ConfigError::StemContainsSeparator(self.object_stem.clone()));
        }
        if self.max_workers == Some(0) {
            return Err(ConfigError::ZeroWorkerLimit);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.dimensions(), Dimensions::new(1248, 344));
        assert_eq!(config.object_stem, "asdf");
        assert_eq!(config.max_workers, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroDimensions { width: 0, .. })
        ));

        let config = PipelineConfig::default().with_object_stem("");
        assert_eq!(config.validate(), Err(ConfigError::EmptyObjectStem));

        let config = PipelineConfig::default().with_object_stem("a/b");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::StemContainsSeparator(_))
        ));

        let config = PipelineConfig::default().with_max_workers(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroWorkerLimit));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: PipelineConfig = toml::from_str("width = 64\nmax_workers = 8\n").unwrap();
        assert_eq!(config.width, 64);
        assert_eq!(config.height, DEFAULT_HEIGHT);
        assert_eq!(config.object_stem, DEFAULT_OBJECT_STEM);
        assert_eq!(config.max_workers, Some(8));
    }
}
