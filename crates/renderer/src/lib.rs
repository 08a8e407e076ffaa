//! Frame presentation for the triangle renderer.
//!
//! - [`FramePresenter`] runs the single-frame-in-flight present cycle
//! - [`PresentBackend`] is the GPU seam it drives; [`VulkanBackend`] is the
//!   real implementation
//! - [`Renderer`] performs Vulkan setup and owns everything

pub mod backend;
pub mod error;
pub mod presenter;
pub mod renderer;
pub mod vulkan;

pub use backend::{CLEAR_COLOR, FrameCommands, IMAGE_WAIT_STAGE, PresentBackend, TRIANGLE_VERTEX_COUNT};
pub use error::{PresentError, RendererError, RendererResult};
pub use presenter::{FramePresenter, FrameState};
pub use renderer::Renderer;
pub use vulkan::{FrameCommandBuffer, VulkanBackend};
