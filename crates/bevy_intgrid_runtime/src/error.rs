use bevy_intgrid_core::{ConfigurationError, GridError, LayerId};
use thiserror::Error;

/// Error type for project and config loading failures
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid project: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// Errors surfaced by an engine pass
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("Project does not fit engine config: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Failed to build matching thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Unknown layer {0}")]
    UnknownLayer(LayerId),
}
