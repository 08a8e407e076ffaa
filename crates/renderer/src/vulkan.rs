//! [`PresentBackend`] over the real device, swapchain and pipeline.

use std::sync::Arc;

use tracing::{debug, info, trace};
use triangle_rhi::command::{CommandBuffer, CommandPool};
use triangle_rhi::device::Device;
use triangle_rhi::pipeline::Pipeline;
use triangle_rhi::render_pass::FramebufferSet;
use triangle_rhi::swapchain::Swapchain;
use triangle_rhi::sync::{Fence, Semaphore};
use triangle_rhi::{vk, RhiError, RhiResult, VkResult};

use crate::backend::{FrameCommands, PresentBackend};

/// A primary command buffer together with the pool it came from.
///
/// The buffer is freed when the pool is destroyed, which happens when this
/// value is dropped.
pub struct FrameCommandBuffer {
    buffer: CommandBuffer,
    pool: CommandPool,
}

impl FrameCommandBuffer {
    #[inline]
    pub fn handle(&self) -> vk::CommandBuffer {
        self.buffer.handle()
    }

    #[inline]
    pub fn pool(&self) -> &CommandPool {
        &self.pool
    }
}

/// Drives the graphics/present queues of one device against one swapchain.
///
/// Holds shared references only; the setup code that built the swapchain,
/// framebuffers and pipeline keeps ownership.
pub struct VulkanBackend {
    framebuffers: Arc<FramebufferSet>,
    pipeline: Arc<Pipeline>,
    swapchain: Arc<Swapchain>,
    device: Arc<Device>,
}

impl VulkanBackend {
    /// # Errors
    ///
    /// Returns [`RhiError::SwapchainError`] when there is not exactly one
    /// framebuffer per swapchain image.
    pub fn new(
        device: Arc<Device>,
        swapchain: Arc<Swapchain>,
        framebuffers: Arc<FramebufferSet>,
        pipeline: Arc<Pipeline>,
    ) -> RhiResult<Self> {
        if framebuffers.len() != swapchain.image_count() as usize {
            return Err(RhiError::SwapchainError(format!(
                "{} framebuffers for {} swapchain images",
                framebuffers.len(),
                swapchain.image_count()
            )));
        }

        info!(
            "Vulkan present backend ready ({} images, {}x{})",
            swapchain.image_count(),
            swapchain.extent().width,
            swapchain.extent().height
        );

        Ok(Self {
            framebuffers,
            pipeline,
            swapchain,
            device,
        })
    }

    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    #[inline]
    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }
}

impl PresentBackend for VulkanBackend {
    type Fence = Fence;
    type Semaphore = Semaphore;
    type CommandBuffer = FrameCommandBuffer;

    fn create_fence(&self, signaled: bool) -> RhiResult<Fence> {
        Fence::new(self.device.clone(), signaled)
    }

    fn create_semaphore(&self) -> RhiResult<Semaphore> {
        Semaphore::new(self.device.clone())
    }

    fn allocate_command_buffer(&self) -> RhiResult<FrameCommandBuffer> {
        let pool = CommandPool::new(self.device.clone(), self.device.graphics_family())?;
        let buffer = CommandBuffer::new(self.device.clone(), &pool)?;
        debug!("Allocated frame command buffer");
        Ok(FrameCommandBuffer { buffer, pool })
    }

    fn image_count(&self) -> u32 {
        self.swapchain.image_count()
    }

    fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    fn wait_for_fence(&self, fence: &Fence, timeout: u64) -> VkResult<()> {
        fence.wait(timeout)
    }

    fn reset_fence(&self, fence: &Fence) -> VkResult<()> {
        fence.reset()
    }

    fn acquire_next_image(&self, signal: &Semaphore, timeout: u64) -> VkResult<(u32, bool)> {
        self.swapchain.acquire_next_image(signal.handle(), timeout)
    }

    fn record(&self, command_buffer: &FrameCommandBuffer, commands: &FrameCommands) -> VkResult<()> {
        let framebuffer = self
            .framebuffers
            .get(commands.framebuffer_index)
            .ok_or(vk::Result::ERROR_UNKNOWN)?;
        let cmd = &command_buffer.buffer;

        cmd.reset()?;
        cmd.begin()?;
        cmd.begin_render_pass(
            self.framebuffers.render_pass().handle(),
            framebuffer,
            commands.render_area(),
            &commands.clear_values(),
        );
        cmd.bind_graphics_pipeline(self.pipeline.handle());
        cmd.set_viewport(&commands.viewport());
        cmd.set_scissor(&commands.scissor());
        cmd.draw(commands.vertex_count, commands.instance_count, 0, 0);
        cmd.end_render_pass();
        cmd.end()?;

        trace!("Recorded frame commands for image {}", commands.framebuffer_index);
        Ok(())
    }

    fn submit(
        &self,
        command_buffer: &FrameCommandBuffer,
        wait: &Semaphore,
        wait_stage: vk::PipelineStageFlags,
        signal: &Semaphore,
        fence: &Fence,
    ) -> VkResult<()> {
        let wait_semaphores = [wait.handle()];
        let wait_stages = [wait_stage];
        let command_buffers = [command_buffer.handle()];
        let signal_semaphores = [signal.handle()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        // SAFETY: every handle in `submit_info` belongs to `self.device` and
        // the fence was reset by the caller before this submission.
        unsafe {
            self.device
                .submit_graphics(std::slice::from_ref(&submit_info), fence.handle())
        }
    }

    fn present(&self, image_index: u32, wait: &Semaphore) -> VkResult<bool> {
        self.swapchain.present(image_index, wait.handle())
    }

    fn wait_idle(&self) -> VkResult<()> {
        self.device.wait_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<VulkanBackend>();
        assert_send_sync::<FrameCommandBuffer>();
    }
}
