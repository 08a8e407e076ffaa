//! Core utilities for the triangle renderer.
//!
//! This crate provides foundational types used across the workspace:
//! - Error types and result aliases
//! - Logging initialization
//! - Configuration loading
//! - Frame rate measurement

mod config;
mod error;
mod logging;
mod timer;

pub use config::{Config, LogConfig, RendererConfig, WindowConfig};
pub use error::{Error, Result};
pub use logging::{DEFAULT_LOG_FILTER, init_logging};
pub use timer::{FrameStats, FrameTimer};
