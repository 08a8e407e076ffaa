//! Renderer setup.
//!
//! [`Renderer::new`] builds the whole chain from a window: instance,
//! surface, GPU, device, swapchain, render pass, framebuffers, shaders,
//! pipeline, and finally the [`FramePresenter`] that draws each frame.

use std::sync::Arc;

use tracing::{debug, info};
use triangle_core::RendererConfig;
use triangle_platform::{Surface, Window};
use triangle_rhi::device::Device;
use triangle_rhi::instance::Instance;
use triangle_rhi::physical_device::select_physical_device;
use triangle_rhi::pipeline::{GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use triangle_rhi::render_pass::{FramebufferSet, RenderPass};
use triangle_rhi::shader::{Shader, ShaderStage};
use triangle_rhi::swapchain::Swapchain;
use triangle_rhi::vk;

use crate::error::{PresentError, RendererResult};
use crate::presenter::{FramePresenter, FrameState};
use crate::vulkan::VulkanBackend;

/// Owns every Vulkan object used to draw the triangle.
///
/// Fields are dropped in declaration order, so the presenter (which waits
/// for the device to go idle) goes first and the instance goes last. The
/// device itself is released once its last `Arc` is gone.
pub struct Renderer {
    presenter: FramePresenter<VulkanBackend>,
    pipeline: Arc<Pipeline>,
    pipeline_layout: PipelineLayout,
    framebuffers: Arc<FramebufferSet>,
    swapchain: Arc<Swapchain>,
    device: Arc<Device>,
    surface: Surface,
    instance: Instance,
}

impl Renderer {
    /// Creates a renderer for `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if any step of the setup fails. Objects created
    /// before the failure are released in reverse order.
    pub fn new(window: &Window, config: &RendererConfig) -> RendererResult<Self> {
        let width = window.width();
        let height = window.height();

        info!(
            "Initializing Vulkan renderer ({}x{}, validation {}, vsync {})",
            width, height, config.validation, config.vsync
        );

        let surface_extensions = window.required_instance_extensions()?;
        let instance = Instance::new(config.validation, &surface_extensions)?;

        let surface = window.create_surface(instance.entry(), instance.handle())?;

        let gpu = select_physical_device(instance.handle(), surface.handle(), surface.loader())?;
        let device = Device::new(&instance, &gpu)?;

        let swapchain = Arc::new(Swapchain::new(
            &instance,
            device.clone(),
            surface.handle(),
            surface.loader(),
            width,
            height,
            config.vsync,
        )?);

        let render_pass = Arc::new(RenderPass::new(device.clone(), swapchain.format())?);
        let framebuffers = Arc::new(FramebufferSet::new(
            device.clone(),
            render_pass.clone(),
            &swapchain,
        )?);

        let pipeline_layout = PipelineLayout::empty(device.clone())?;
        let pipeline = Arc::new(Self::create_pipeline(
            &device,
            &render_pass,
            &pipeline_layout,
            config,
        )?);

        let backend = VulkanBackend::new(
            device.clone(),
            swapchain.clone(),
            framebuffers.clone(),
            pipeline.clone(),
        )?;
        let presenter = FramePresenter::new(backend)?;

        info!(
            "Renderer initialized: {} swapchain images, {:?}, {:?}",
            swapchain.image_count(),
            swapchain.format(),
            swapchain.present_mode()
        );

        Ok(Self {
            presenter,
            pipeline,
            pipeline_layout,
            framebuffers,
            swapchain,
            device,
            surface,
            instance,
        })
    }

    /// Loads both shader stages and builds the triangle pipeline.
    ///
    /// The shader modules are only needed during pipeline creation and are
    /// destroyed on return.
    fn create_pipeline(
        device: &Arc<Device>,
        render_pass: &RenderPass,
        layout: &PipelineLayout,
        config: &RendererConfig,
    ) -> RendererResult<Pipeline> {
        let vertex = Shader::from_spirv_file(device.clone(), &config.vertex_shader, ShaderStage::Vertex)?;
        let fragment = Shader::from_spirv_file(
            device.clone(),
            &config.fragment_shader,
            ShaderStage::Fragment,
        )?;

        let pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&vertex)
            .fragment_shader(&fragment)
            .render_pass(render_pass)
            .build(device.clone(), layout)?;

        debug!("Triangle pipeline ready");
        Ok(pipeline)
    }

    /// Draws and presents one frame.
    ///
    /// # Errors
    ///
    /// Returns the presenter's error. Every error is fatal.
    pub fn render_frame(&mut self) -> Result<u32, PresentError> {
        self.presenter.render_frame()
    }

    #[inline]
    pub fn frame_state(&self) -> FrameState {
        self.presenter.state()
    }

    #[inline]
    pub fn frames_presented(&self) -> u64 {
        self.presenter.frames_presented()
    }

    /// Swapchain extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    /// Swapchain format.
    pub fn format(&self) -> vk::Format {
        self.swapchain.format()
    }

    pub fn validation_enabled(&self) -> bool {
        self.instance.has_validation()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        info!(
            "Destroying renderer after {} frames ({} framebuffers, pipeline {:?}, layout {:?})",
            self.presenter.frames_presented(),
            self.framebuffers.len(),
            self.pipeline.handle(),
            self.pipeline_layout.handle()
        );
        debug!(
            "Device {:?} and surface {:?} are released last",
            self.device.physical_device(),
            self.surface.handle()
        );
    }
}
