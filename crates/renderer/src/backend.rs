//! The device-facing seam of the frame loop.
//!
//! [`FramePresenter`](crate::FramePresenter) issues every GPU call through
//! [`PresentBackend`]. [`VulkanBackend`](crate::VulkanBackend) forwards them
//! to ash; tests plug in a scripted implementation.
//!
//! Per-frame calls return the raw [`vk::Result`] so the presenter can map
//! each failure to the stage it happened in.

use triangle_rhi::vk;
use triangle_rhi::{RhiResult, VkResult};

/// Clear color for the single color attachment: opaque black.
pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Vertices drawn per frame. Positions are generated in the vertex shader.
pub const TRIANGLE_VERTEX_COUNT: u32 = 3;

/// Stage at which submitted work waits for the acquired image.
pub const IMAGE_WAIT_STAGE: vk::PipelineStageFlags = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;

/// Everything recorded into the command buffer for one frame.
///
/// Built fresh each frame from the acquired index and the swapchain extent,
/// so identical inputs always produce an identical command stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameCommands {
    /// Framebuffer (and swapchain image) to render into.
    pub framebuffer_index: u32,
    pub width: u32,
    pub height: u32,
    pub clear_color: [f32; 4],
    pub vertex_count: u32,
    pub instance_count: u32,
}

impl FrameCommands {
    /// The fixed triangle draw into framebuffer `framebuffer_index`.
    pub fn triangle(framebuffer_index: u32, extent: vk::Extent2D) -> Self {
        Self {
            framebuffer_index,
            width: extent.width,
            height: extent.height,
            clear_color: CLEAR_COLOR,
            vertex_count: TRIANGLE_VERTEX_COUNT,
            instance_count: 1,
        }
    }

    pub fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }

    /// Render area covering the whole framebuffer.
    pub fn render_area(&self) -> vk::Rect2D {
        vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: self.extent(),
        }
    }

    /// Full-extent viewport with the standard `[0, 1]` depth range.
    pub fn viewport(&self) -> vk::Viewport {
        vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: self.width as f32,
            height: self.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    /// Scissor equal to the render area.
    pub fn scissor(&self) -> vk::Rect2D {
        self.render_area()
    }

    pub fn clear_values(&self) -> [vk::ClearValue; 1] {
        [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: self.clear_color,
            },
        }]
    }
}

/// GPU operations needed by the single-frame-in-flight loop.
///
/// The associated types are owned handles: dropping one releases it. The
/// presenter never drops them while work that uses them may be pending.
pub trait PresentBackend {
    type Fence;
    type Semaphore;
    type CommandBuffer;

    fn create_fence(&self, signaled: bool) -> RhiResult<Self::Fence>;
    fn create_semaphore(&self) -> RhiResult<Self::Semaphore>;
    fn allocate_command_buffer(&self) -> RhiResult<Self::CommandBuffer>;

    /// Number of presentable images.
    fn image_count(&self) -> u32;
    /// Extent every framebuffer was created with.
    fn extent(&self) -> vk::Extent2D;

    fn wait_for_fence(&self, fence: &Self::Fence, timeout: u64) -> VkResult<()>;
    fn reset_fence(&self, fence: &Self::Fence) -> VkResult<()>;

    /// Returns `(image_index, suboptimal)` and signals `signal` once the
    /// image is ready.
    fn acquire_next_image(&self, signal: &Self::Semaphore, timeout: u64) -> VkResult<(u32, bool)>;

    /// Resets `command_buffer` and records `commands` into it.
    fn record(&self, command_buffer: &Self::CommandBuffer, commands: &FrameCommands) -> VkResult<()>;

    /// Submits to the graphics queue.
    fn submit(
        &self,
        command_buffer: &Self::CommandBuffer,
        wait: &Self::Semaphore,
        wait_stage: vk::PipelineStageFlags,
        signal: &Self::Semaphore,
        fence: &Self::Fence,
    ) -> VkResult<()>;

    /// Presents `image_index` after `wait`. Returns `true` when suboptimal.
    fn present(&self, image_index: u32, wait: &Self::Semaphore) -> VkResult<bool>;

    /// Blocks until the device has no pending work.
    fn wait_idle(&self) -> VkResult<()>;
}
