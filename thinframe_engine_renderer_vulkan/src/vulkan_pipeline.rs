/// VulkanPipeline - graphics pipeline and the layout it owns
///
/// Viewport and scissor are dynamic, so one pipeline stays valid across
/// presentation chain rebuilds as long as the render pass is compatible.

use ash::vk;
use std::ffi::CString;
use std::sync::Arc;
use thinframe_engine::engine_warn;
use thinframe_engine::thinframe::render::{Pipeline, PipelineDesc};
use thinframe_engine::thinframe::{Error, Result};

use crate::vulkan::{
    blend_factor_to_vk, blend_op_to_vk, color_write_mask_to_vk, cull_mode_to_vk, front_face_to_vk,
    polygon_mode_to_vk, topology_to_vk, vertex_format_to_vk,
};
use crate::vulkan_context::GpuContext;
use crate::vulkan_render_pass::VulkanRenderPass;
use crate::vulkan_shader::VulkanShader;

pub struct VulkanPipeline {
    ctx: Arc<GpuContext>,
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) pipeline_layout: vk::PipelineLayout,
}

fn pipeline_failed(message: String) -> Error {
    engine_warn!("thinframe::vulkan", "{}", message);
    Error::PipelineCreation(message)
}

fn downcast_shader<'a>(shader: &'a dyn thinframe_engine::thinframe::render::Shader) -> Result<&'a VulkanShader> {
    shader
        .as_any()
        .downcast_ref::<VulkanShader>()
        .ok_or_else(|| Error::InvalidResource("pipeline needs Vulkan shaders".to_string()))
}

impl VulkanPipeline {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &PipelineDesc) -> Result<Self> {
        let vertex_shader = downcast_shader(desc.vertex_shader)?;
        let fragment_shader = downcast_shader(desc.fragment_shader)?;
        let render_pass = desc
            .render_pass
            .as_any()
            .downcast_ref::<VulkanRenderPass>()
            .ok_or_else(|| Error::InvalidResource("pipeline needs a Vulkan render pass".to_string()))?;

        let entry_point_vert = CString::new(desc.vertex_shader.entry_point())
            .map_err(|e| pipeline_failed(format!("Invalid vertex entry point: {}", e)))?;
        let entry_point_frag = CString::new(desc.fragment_shader.entry_point())
            .map_err(|e| pipeline_failed(format!("Invalid fragment entry point: {}", e)))?;

        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vertex_shader.stage_flags())
                .module(vertex_shader.module)
                .name(&entry_point_vert),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(fragment_shader.stage_flags())
                .module(fragment_shader.module)
                .name(&entry_point_frag),
        ];

        let vertex_bindings: Vec<vk::VertexInputBindingDescription> = desc
            .vertex_layout
            .bindings
            .iter()
            .map(|binding| vk::VertexInputBindingDescription {
                binding: binding.binding,
                stride: binding.stride,
                input_rate: vk::VertexInputRate::VERTEX,
            })
            .collect();
        let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc
            .vertex_layout
            .attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                location: attribute.location,
                binding: attribute.binding,
                format: vertex_format_to_vk(attribute.format),
                offset: attribute.offset,
            })
            .collect();
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(desc.topology))
            .primitive_restart_enable(false);

        // Counts only; the values are set per command list
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(polygon_mode_to_vk(desc.rasterization.polygon_mode))
            .line_width(1.0)
            .cull_mode(cull_mode_to_vk(desc.rasterization.cull_mode))
            .front_face(front_face_to_vk(desc.rasterization.front_face))
            .depth_bias_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let blend = &desc.color_blend;
        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(color_write_mask_to_vk(blend.color_write_mask))
            .blend_enable(blend.blend_enable)
            .src_color_blend_factor(blend_factor_to_vk(blend.src_color_factor))
            .dst_color_blend_factor(blend_factor_to_vk(blend.dst_color_factor))
            .color_blend_op(blend_op_to_vk(blend.color_blend_op))
            .src_alpha_blend_factor(blend_factor_to_vk(blend.src_alpha_factor))
            .dst_alpha_blend_factor(blend_factor_to_vk(blend.dst_alpha_factor))
            .alpha_blend_op(blend_op_to_vk(blend.alpha_blend_op));
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(std::slice::from_ref(&color_blend_attachment));

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        // No descriptor sets, no push constants
        let layout_create_info = vk::PipelineLayoutCreateInfo::default();

        unsafe {
            let device = ctx.device();
            let pipeline_layout = device
                .create_pipeline_layout(&layout_create_info, None)
                .map_err(|e| pipeline_failed(format!("Failed to create pipeline layout: {:?}", e)))?;

            let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
                .stages(&shader_stages)
                .vertex_input_state(&vertex_input_state)
                .input_assembly_state(&input_assembly_state)
                .viewport_state(&viewport_state)
                .rasterization_state(&rasterization_state)
                .multisample_state(&multisample_state)
                .color_blend_state(&color_blend_state)
                .dynamic_state(&dynamic_state)
                .layout(pipeline_layout)
                .render_pass(render_pass.render_pass)
                .subpass(0);

            let pipeline = match device.create_graphics_pipelines(
                vk::PipelineCache::null(),
                std::slice::from_ref(&pipeline_create_info),
                None,
            ) {
                Ok(pipelines) => pipelines.into_iter().next(),
                Err((pipelines, e)) => {
                    for pipeline in pipelines.into_iter().filter(|p| *p != vk::Pipeline::null()) {
                        device.destroy_pipeline(pipeline, None);
                    }
                    device.destroy_pipeline_layout(pipeline_layout, None);
                    return Err(pipeline_failed(format!("Failed to create graphics pipeline: {:?}", e)));
                }
            };

            let Some(pipeline) = pipeline else {
                device.destroy_pipeline_layout(pipeline_layout, None);
                return Err(pipeline_failed("Driver returned no pipeline".to_string()));
            };

            Ok(Self { ctx, pipeline, pipeline_layout })
        }
    }
}

impl Pipeline for VulkanPipeline {}

impl Drop for VulkanPipeline {
    fn drop(&mut self) {
        unsafe {
            let device = self.ctx.device();
            device.destroy_pipeline(self.pipeline, None);
            device.destroy_pipeline_layout(self.pipeline_layout, None);
        }
    }
}
