//! Render pass and per-image framebuffers for presenting.
//!
//! The render pass has a single color attachment in the swapchain format:
//! cleared on load, stored, and left in `PRESENT_SRC_KHR`. An external
//! dependency on the color-attachment-output stage makes the layout
//! transition wait for the image-available semaphore.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::swapchain::Swapchain;

/// Single-subpass color render pass.
pub struct RenderPass {
    device: Arc<Device>,
    render_pass: vk::RenderPass,
    format: vk::Format,
}

impl RenderPass {
    /// Creates a render pass whose only attachment has `format`.
    ///
    /// # Errors
    ///
    /// Returns an error if render pass creation fails.
    pub fn new(device: Arc<Device>, format: vk::Format) -> RhiResult<Self> {
        let attachments = [color_attachment(format)];
        let color_refs = [vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];
        let subpasses = [vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)];
        let dependencies = [external_dependency()];

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = unsafe { device.handle().create_render_pass(&create_info, None)? };

        info!("Render pass created (format {:?})", format);

        Ok(Self {
            device,
            render_pass,
            format,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::RenderPass {
        self.render_pass
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_render_pass(self.render_pass, None);
        }
        info!("Render pass destroyed");
    }
}

/// One framebuffer per swapchain image, indexed by image index.
///
/// Holds the render pass it was built against so the pass cannot be
/// destroyed first.
pub struct FramebufferSet {
    device: Arc<Device>,
    render_pass: Arc<RenderPass>,
    framebuffers: Vec<vk::Framebuffer>,
    extent: vk::Extent2D,
}

impl FramebufferSet {
    /// Creates a framebuffer for every image view of `swapchain`.
    ///
    /// # Errors
    ///
    /// Returns an error if any framebuffer cannot be created; the ones
    /// already created are destroyed.
    pub fn new(device: Arc<Device>, render_pass: Arc<RenderPass>, swapchain: &Swapchain) -> RhiResult<Self> {
        let extent = swapchain.extent();
        let mut set = Self {
            device,
            render_pass,
            framebuffers: Vec::with_capacity(swapchain.image_views().len()),
            extent,
        };

        for (i, &view) in swapchain.image_views().iter().enumerate() {
            let attachments = [view];
            let create_info = vk::FramebufferCreateInfo::default()
                .render_pass(set.render_pass.handle())
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);

            let framebuffer = unsafe { set.device.handle().create_framebuffer(&create_info, None) }
                .map_err(|e| RhiError::SwapchainError(format!("Failed to create framebuffer {}: {:?}", i, e)))?;
            set.framebuffers.push(framebuffer);
        }

        debug!(
            "Created {} framebuffers ({}x{})",
            set.framebuffers.len(),
            extent.width,
            extent.height
        );

        Ok(set)
    }

    /// Framebuffer for swapchain image `index`.
    #[inline]
    pub fn get(&self, index: u32) -> Option<vk::Framebuffer> {
        self.framebuffers.get(index as usize).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    #[inline]
    pub fn render_pass(&self) -> &RenderPass {
        &self.render_pass
    }
}

impl Drop for FramebufferSet {
    fn drop(&mut self) {
        unsafe {
            for &framebuffer in &self.framebuffers {
                self.device.handle().destroy_framebuffer(framebuffer, None);
            }
        }
        debug!("Destroyed {} framebuffers", self.framebuffers.len());
    }
}

fn color_attachment(format: vk::Format) -> vk::AttachmentDescription {
    vk::AttachmentDescription {
        format,
        samples: vk::SampleCountFlags::TYPE_1,
        load_op: vk::AttachmentLoadOp::CLEAR,
        store_op: vk::AttachmentStoreOp::STORE,
        stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
        stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
        initial_layout: vk::ImageLayout::UNDEFINED,
        final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
        ..Default::default()
    }
}

fn external_dependency() -> vk::SubpassDependency {
    vk::SubpassDependency {
        src_subpass: vk::SUBPASS_EXTERNAL,
        dst_subpass: 0,
        src_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        dst_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        src_access_mask: vk::AccessFlags::empty(),
        dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        ..Default::default()
    }
}
