//! Vulkan abstraction layer (Render Hardware Interface).
//!
//! A thin RAII layer over `ash`. Every wrapper destroys its handle on drop
//! and holds an `Arc<Device>` so the device outlives it. It covers:
//! - Instance creation with validation and a `tracing` debug messenger
//! - GPU selection and logical device creation
//! - Swapchain, render pass and framebuffers
//! - Shader modules and the graphics pipeline
//! - Command pools/buffers and synchronization primitives

mod error;

pub mod command;
pub mod device;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod sync;

pub use error::{RhiError, RhiResult};

// Re-export ash types that users might need
pub use ash::prelude::VkResult;
pub use ash::vk;
