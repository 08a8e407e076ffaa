//! Command pool and command buffer management.
//!
//! - [`CommandPool`] owns a VkCommandPool and allocates primary buffers from it
//! - [`CommandBuffer`] wraps a VkCommandBuffer with the recording calls the
//!   renderer needs
//!
//! Recording calls return the raw [`vk::Result`] on failure so callers can
//! classify it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use triangle_rhi::device::Device;
//! use triangle_rhi::command::{CommandPool, CommandBuffer};
//!
//! # fn example(device: Arc<Device>) -> Result<(), triangle_rhi::RhiError> {
//! let pool = CommandPool::new(device.clone(), device.graphics_family())?;
//! let cmd = CommandBuffer::new(device.clone(), &pool)?;
//!
//! cmd.begin()?;
//! // ... record rendering commands ...
//! cmd.end()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::prelude::VkResult;
use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::RhiResult;

/// Vulkan command pool wrapper.
///
/// Destroying the pool frees every command buffer allocated from it.
///
/// # Thread Safety
///
/// Command pools are externally synchronized; allocate and record from one
/// thread at a time.
pub struct CommandPool {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan command pool handle.
    pool: vk::CommandPool,
    /// Queue family index this pool belongs to.
    queue_family_index: u32,
}

impl CommandPool {
    /// Creates a command pool for `queue_family_index`.
    ///
    /// The pool has `RESET_COMMAND_BUFFER` so a single buffer can be reset
    /// and re-recorded every frame.
    ///
    /// # Errors
    ///
    /// Returns an error if command pool creation fails.
    pub fn new(device: Arc<Device>, queue_family_index: u32) -> RhiResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let pool = unsafe { device.handle().create_command_pool(&create_info, None)? };

        info!("Command pool created for queue family {}", queue_family_index);

        Ok(Self {
            device,
            pool,
            queue_family_index,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// Allocates one primary command buffer.
    pub fn allocate_command_buffer(&self) -> RhiResult<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let buffers = unsafe { self.device.handle().allocate_command_buffers(&alloc_info)? };
        debug!("Allocated primary command buffer");
        Ok(buffers[0])
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_command_pool(self.pool, None);
        }
        info!(
            "Command pool destroyed for queue family {}",
            self.queue_family_index
        );
    }
}

/// Vulkan command buffer wrapper.
///
/// Commands are recorded between [`begin`](Self::begin) and
/// [`end`](Self::end).
///
/// # Note
///
/// The command buffer does NOT own the underlying VkCommandBuffer handle.
/// The handle is freed when the owning [`CommandPool`] is destroyed, so the
/// pool must outlive this wrapper.
pub struct CommandBuffer {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan command buffer handle.
    buffer: vk::CommandBuffer,
}

impl CommandBuffer {
    /// Allocates a primary command buffer from `pool`.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    pub fn new(device: Arc<Device>, pool: &CommandPool) -> RhiResult<Self> {
        let buffer = pool.allocate_command_buffer()?;
        Ok(Self { device, buffer })
    }

    #[inline]
    pub fn handle(&self) -> vk::CommandBuffer {
        self.buffer
    }

    // =========================================================================
    // Recording Lifecycle
    // =========================================================================

    /// Begins recording for a single submission.
    pub fn begin(&self) -> VkResult<()> {
        let begin_info =
            vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe { self.device.handle().begin_command_buffer(self.buffer, &begin_info) }
    }

    /// Ends recording.
    pub fn end(&self) -> VkResult<()> {
        unsafe { self.device.handle().end_command_buffer(self.buffer) }
    }

    /// Returns the buffer to the initial state.
    ///
    /// The buffer must not be pending execution.
    pub fn reset(&self) -> VkResult<()> {
        unsafe {
            self.device
                .handle()
                .reset_command_buffer(self.buffer, vk::CommandBufferResetFlags::empty())
        }
    }

    // =========================================================================
    // Render Pass
    // =========================================================================

    /// Begins `render_pass` on `framebuffer` with inline subpass contents.
    pub fn begin_render_pass(
        &self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_values: &[vk::ClearValue],
    ) {
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(render_area)
            .clear_values(clear_values);

        unsafe {
            self.device.handle().cmd_begin_render_pass(
                self.buffer,
                &begin_info,
                vk::SubpassContents::INLINE,
            );
        }
    }

    pub fn end_render_pass(&self) {
        unsafe {
            self.device.handle().cmd_end_render_pass(self.buffer);
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn bind_graphics_pipeline(&self, pipeline: vk::Pipeline) {
        unsafe {
            self.device.handle().cmd_bind_pipeline(
                self.buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline,
            );
        }
    }

    /// Sets viewport 0. The pipeline must declare the viewport dynamic.
    pub fn set_viewport(&self, viewport: &vk::Viewport) {
        unsafe {
            self.device
                .handle()
                .cmd_set_viewport(self.buffer, 0, std::slice::from_ref(viewport));
        }
    }

    /// Sets scissor 0. The pipeline must declare the scissor dynamic.
    pub fn set_scissor(&self, scissor: &vk::Rect2D) {
        unsafe {
            self.device
                .handle()
                .cmd_set_scissor(self.buffer, 0, std::slice::from_ref(scissor));
        }
    }

    // =========================================================================
    // Draw
    // =========================================================================

    /// Non-indexed draw. Vertices may come entirely from the shader.
    pub fn draw(&self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        unsafe {
            self.device.handle().cmd_draw(
                self.buffer,
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
        }
    }
}
