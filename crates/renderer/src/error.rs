//! Renderer error types.

use thiserror::Error;
use triangle_rhi::{vk, RhiError};

/// A failed frame.
///
/// Every variant is fatal: the presenter stops and the caller is expected
/// to end the render loop.
#[derive(Error, Debug)]
pub enum PresentError {
    /// Image acquisition or presentation failed, including an out-of-date
    /// swapchain.
    #[error("Swapchain error: {0}")]
    Swapchain(vk::Result),

    #[error("Command recording failed: {0}")]
    CommandRecording(vk::Result),

    #[error("Queue submit failed: {0}")]
    Submit(vk::Result),

    /// Waiting on or resetting the in-flight fence failed.
    #[error("In-flight fence error: {0}")]
    Fence(vk::Result),

    #[error("Acquired image index {index} is out of range ({image_count} swapchain images)")]
    InvalidImageIndex { index: u32, image_count: u32 },

    /// Creating the presenter's fence, semaphores or command buffer failed.
    #[error("Failed to create frame resources: {0}")]
    Setup(#[from] RhiError),

    /// An earlier frame failed; the presenter no longer touches the device.
    #[error("Presenter halted after a fatal error")]
    Halted,
}

impl PresentError {
    /// The Vulkan status code behind this error, if there is one.
    pub fn code(&self) -> Option<vk::Result> {
        match self {
            Self::Swapchain(result)
            | Self::CommandRecording(result)
            | Self::Submit(result)
            | Self::Fence(result) => Some(*result),
            Self::Setup(err) => err.vk_result(),
            Self::InvalidImageIndex { .. } | Self::Halted => None,
        }
    }
}

/// Renderer construction error.
#[derive(Error, Debug)]
pub enum RendererError {
    #[error(transparent)]
    Rhi(#[from] RhiError),

    /// Window or surface setup failed.
    #[error(transparent)]
    Platform(#[from] triangle_core::Error),

    #[error(transparent)]
    Present(#[from] PresentError),
}

pub type RendererResult<T> = std::result::Result<T, RendererError>;
