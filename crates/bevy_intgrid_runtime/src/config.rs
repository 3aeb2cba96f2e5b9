//! Engine tuning, loaded from TOML

use std::path::Path;

use bevy_intgrid_core::{DEFAULT_LAYER_CAPACITY, EMPTY_VALUE};
use serde::{Deserialize, Serialize};

use crate::LoadError;

/// Runtime settings for an [`IntGridEngine`](crate::IntGridEngine).
///
/// Every field is optional in the TOML file.
///
/// ```toml
/// partition_size = 128
/// worker_threads = 4
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial queue and layer capacity
    pub default_layer_capacity: usize,
    /// Dirty positions per matching partition
    pub partition_size: usize,
    /// Dedicated matching threads; 0 uses rayon's global pool
    pub worker_threads: usize,
    /// Match partitions in parallel
    pub parallel: bool,
    /// Value missing cells read as during matching. Writing it erases a
    /// cell, and no palette entry may use it.
    pub empty_value: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_layer_capacity: DEFAULT_LAYER_CAPACITY,
            partition_size: 256,
            worker_threads: 0,
            parallel: true,
            empty_value: EMPTY_VALUE,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, LoadError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn with_partition_size(mut self, partition_size: usize) -> Self {
        self.partition_size = partition_size;
        self
    }

    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.default_layer_capacity, 64);
        assert_eq!(config.partition_size, 256);
        assert!(config.parallel);
    }

    #[test]
    fn partial_file_overrides_fields() {
        let config = EngineConfig::from_toml_str(
            r#"
partition_size = 16
worker_threads = 2
parallel = false
"#,
        )
        .unwrap();
        assert_eq!(config.partition_size, 16);
        assert_eq!(config.worker_threads, 2);
        assert!(!config.parallel);
        assert_eq!(config.empty_value, 0);
    }

    #[test]
    fn bad_toml_is_a_load_error() {
        let err = EngineConfig::from_toml_str("partition_size = \"many\"").unwrap_err();
        assert!(matches!(err, LoadError::Toml(_)));
    }

    #[test]
    fn load_from_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("intgrid.toml");
        std::fs::write(&path, "empty_value = -1\n").unwrap();
        let config = EngineConfig::from_path(&path).unwrap();
        assert_eq!(config.empty_value, -1);
    }
}
