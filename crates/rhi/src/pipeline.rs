//! Graphics pipeline management.
//!
//! - [`PipelineLayout`] wraps VkPipelineLayout
//! - [`Pipeline`] wraps a graphics VkPipeline
//! - [`GraphicsPipelineBuilder`] builds a pipeline against a render pass,
//!   with viewport and scissor left dynamic
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use triangle_rhi::device::Device;
//! use triangle_rhi::pipeline::{GraphicsPipelineBuilder, PipelineLayout};
//! use triangle_rhi::render_pass::RenderPass;
//! use triangle_rhi::shader::{Shader, ShaderStage};
//!
//! # fn example(device: Arc<Device>, render_pass: &RenderPass) -> Result<(), triangle_rhi::RhiError> {
//! let vert = Shader::from_spirv_file(device.clone(), Path::new("tri.vert.spv"), ShaderStage::Vertex)?;
//! let frag = Shader::from_spirv_file(device.clone(), Path::new("tri.frag.spv"), ShaderStage::Fragment)?;
//! let layout = PipelineLayout::empty(device.clone())?;
//!
//! let pipeline = GraphicsPipelineBuilder::new()
//!     .vertex_shader(&vert)
//!     .fragment_shader(&frag)
//!     .render_pass(render_pass)
//!     .build(device, &layout)?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::render_pass::RenderPass;
use crate::shader::Shader;

/// States set per frame with `cmd_set_*` instead of baked into the pipeline.
pub const DYNAMIC_STATES: [vk::DynamicState; 2] = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];

/// Vulkan pipeline layout wrapper.
pub struct PipelineLayout {
    device: Arc<Device>,
    layout: vk::PipelineLayout,
}

impl PipelineLayout {
    /// Creates a layout with no descriptor sets and no push constants.
    pub fn empty(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::PipelineLayoutCreateInfo::default();
        let layout = unsafe { device.handle().create_pipeline_layout(&create_info, None)? };

        debug!("Created empty pipeline layout");

        Ok(Self { device, layout })
    }

    #[inline]
    pub fn handle(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_pipeline_layout(self.layout, None);
        }
        debug!("Pipeline layout destroyed");
    }
}

/// Graphics pipeline wrapper.
pub struct Pipeline {
    device: Arc<Device>,
    pipeline: vk::Pipeline,
}

impl Pipeline {
    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_pipeline(self.pipeline, None);
        }
        info!("Graphics pipeline destroyed");
    }
}

/// Face culling mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

impl CullMode {
    pub fn to_vk(self) -> vk::CullModeFlags {
        match self {
            CullMode::None => vk::CullModeFlags::NONE,
            CullMode::Front => vk::CullModeFlags::FRONT,
            CullMode::Back => vk::CullModeFlags::BACK,
        }
    }
}

/// Winding order of front-facing triangles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrontFace {
    #[default]
    Clockwise,
    CounterClockwise,
}

impl FrontFace {
    pub fn to_vk(self) -> vk::FrontFace {
        match self {
            FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
            FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
        }
    }
}

/// Builder for a triangle-list graphics pipeline with no vertex input.
///
/// Vertices are generated in the vertex shader, so no bindings or
/// attributes are declared. Blending is off and the color write mask
/// covers RGBA.
#[derive(Default)]
pub struct GraphicsPipelineBuilder<'a> {
    vertex_shader: Option<&'a Shader>,
    fragment_shader: Option<&'a Shader>,
    render_pass: Option<&'a RenderPass>,
    subpass: u32,
    cull_mode: CullMode,
    front_face: FrontFace,
}

impl<'a> GraphicsPipelineBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_shader(mut self, shader: &'a Shader) -> Self {
        self.vertex_shader = Some(shader);
        self
    }

    pub fn fragment_shader(mut self, shader: &'a Shader) -> Self {
        self.fragment_shader = Some(shader);
        self
    }

    pub fn render_pass(mut self, render_pass: &'a RenderPass) -> Self {
        self.render_pass = Some(render_pass);
        self
    }

    pub fn subpass(mut self, subpass: u32) -> Self {
        self.subpass = subpass;
        self
    }

    pub fn cull_mode(mut self, mode: CullMode) -> Self {
        self.cull_mode = mode;
        self
    }

    pub fn front_face(mut self, face: FrontFace) -> Self {
        self.front_face = face;
        self
    }

    fn required(&self) -> RhiResult<(&'a Shader, &'a Shader, &'a RenderPass)> {
        let vertex = self
            .vertex_shader
            .ok_or_else(|| RhiError::PipelineError("Vertex shader is required".to_string()))?;
        let fragment = self
            .fragment_shader
            .ok_or_else(|| RhiError::PipelineError("Fragment shader is required".to_string()))?;
        let render_pass = self
            .render_pass
            .ok_or_else(|| RhiError::PipelineError("Render pass is required".to_string()))?;
        Ok((vertex, fragment, render_pass))
    }

    /// Creates the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if a shader or the render pass is missing, or if
    /// pipeline creation fails.
    pub fn build(self, device: Arc<Device>, layout: &PipelineLayout) -> RhiResult<Pipeline> {
        let (vertex_shader, fragment_shader, render_pass) = self.required()?;

        let shader_stages = [
            vertex_shader.stage_create_info(),
            fragment_shader.stage_create_info(),
        ];

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default();
        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Counts only; the values come from cmd_set_viewport/cmd_set_scissor.
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(self.cull_mode.to_vk())
            .front_face(self.front_face.to_vk());

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(false)
            .color_write_mask(vk::ColorComponentFlags::RGBA)];
        let color_blend_state =
            vk::PipelineColorBlendStateCreateInfo::default().attachments(&color_blend_attachments);

        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&DYNAMIC_STATES);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout.handle())
            .render_pass(render_pass.handle())
            .subpass(self.subpass);

        let pipelines = unsafe {
            device
                .handle()
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
                .map_err(|(_, result)| result)?
        };
        let pipeline = pipelines
            .first()
            .copied()
            .ok_or_else(|| RhiError::PipelineError("Driver returned no pipeline".to_string()))?;

        info!(
            "Graphics pipeline created (cull {:?}, front face {:?})",
            self.cull_mode, self.front_face
        );

        Ok(Pipeline { device, pipeline })
    }
}
