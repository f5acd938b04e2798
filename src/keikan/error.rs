use crate::model::terrain::TerrainError;
use thiserror::Error;

/// Failures that stop the process before the worker threads run. Reported to
/// the user; the binary exits with a non-zero status.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to create Vulkan instance: {0}")]
    Instance(String),
    #[error("failed to create window surface: {0}")]
    Surface(String),
    #[error("no GPU can present to this window")]
    NoSuitableDevice,
    #[error("failed to create logical device: {0}")]
    Device(String),
    #[error("{0} requested but not supported")]
    MissingFeature(&'static str),
    #[error("failed to build terrain: {0}")]
    Terrain(#[from] TerrainError),
    #[error("failed to start {0} thread: {1}")]
    Thread(&'static str, #[source] std::io::Error),
}
