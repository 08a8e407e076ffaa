//! Application configuration loaded from TOML.
//!
//! Every field has a default, so an empty document (or no file at all)
//! yields a usable [`Config`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::logging::DEFAULT_LOG_FILTER;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub renderer: RendererConfig,
    pub log: LogConfig,
}

/// Window settings. The window is never resizable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "vulkan".to_string(),
        }
    }
}

/// Renderer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Enable `VK_LAYER_KHRONOS_validation` and the debug messenger.
    pub validation: bool,
    /// Prefer FIFO presentation. When off, MAILBOX is used if available.
    pub vsync: bool,
    /// SPIR-V file for the vertex stage.
    pub vertex_shader: PathBuf,
    /// SPIR-V file for the fragment stage.
    pub fragment_shader: PathBuf,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            validation: cfg!(debug_assertions),
            vsync: true,
            vertex_shader: PathBuf::from("shaders/spirv/triangle.vert.spv"),
            fragment_shader: PathBuf::from("shaders/spirv/triangle.frag.spv"),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Reads and validates a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the renderer cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::Config(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if self.renderer.vertex_shader.as_os_str().is_empty() {
            return Err(Error::Config("renderer.vertex_shader is empty".to_string()));
        }
        if self.renderer.fragment_shader.as_os_str().is_empty() {
            return Err(Error::Config("renderer.fragment_shader is empty".to_string()));
        }
        Ok(())
    }
}
