//! RHI-specific error types.

use thiserror::Error;

/// RHI-specific error type.
#[derive(Error, Debug)]
pub enum RhiError {
    /// Vulkan API error
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] ash::vk::Result),

    /// Failed to load the Vulkan loader library
    #[error("Failed to load Vulkan: {0}")]
    LoadingError(#[from] ash::LoadingError),

    /// Instance or device extensions the driver does not provide
    #[error("Missing Vulkan extensions: {}", .0.join(", "))]
    MissingExtensions(Vec<String>),

    /// A requested instance layer is not installed
    #[error("Vulkan layer not available: {0}")]
    MissingLayer(String),

    /// No suitable GPU found
    #[error("No suitable GPU found")]
    NoSuitableGpu,

    /// Shader loading error
    #[error("Shader error: {0}")]
    ShaderError(String),

    /// Surface query error
    #[error("Surface error: {0}")]
    SurfaceError(String),

    /// Swapchain creation error
    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// Pipeline creation error
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl RhiError {
    /// The Vulkan status code behind this error, if there is one.
    pub fn vk_result(&self) -> Option<ash::vk::Result> {
        match self {
            Self::VulkanError(result) => Some(*result),
            _ => None,
        }
    }
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk;

    #[test]
    fn test_vk_result_passthrough() {
        let err: RhiError = vk::Result::ERROR_DEVICE_LOST.into();
        assert_eq!(err.vk_result(), Some(vk::Result::ERROR_DEVICE_LOST));
        assert_eq!(RhiError::NoSuitableGpu.vk_result(), None);
    }

    #[test]
    fn test_missing_extensions_message() {
        let err = RhiError::MissingExtensions(vec![
            "VK_KHR_surface".to_string(),
            "VK_KHR_swapchain".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Missing Vulkan extensions: VK_KHR_surface, VK_KHR_swapchain"
        );
    }
}
