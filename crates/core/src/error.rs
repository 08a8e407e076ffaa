//! Error types shared by the triangle workspace.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised outside the Vulkan layer: configuration and windowing.
#[derive(Error, Debug)]
pub enum Error {
    /// Window creation or handle lookup failed
    #[error("Window error: {0}")]
    Window(String),

    /// Surface-related Vulkan failure reported by the platform layer
    #[error("Vulkan error: {0}")]
    Vulkan(String),

    /// A config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A config document was not valid TOML for [`crate::Config`]
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A config value was syntactically fine but unusable
    #[error("Invalid config: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the workspace's core [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
