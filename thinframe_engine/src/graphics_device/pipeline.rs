//! Pipeline trait and the fixed pipeline descriptor

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use crate::graphics_device::{AsAny, RenderPass, Shader};

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    TriangleList,
}

/// Vertex attribute formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum VertexFormat {
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT,
}

impl VertexFormat {
    pub fn size_bytes(&self) -> u32 {
        match self {
            VertexFormat::R32G32_SFLOAT => 8,
            VertexFormat::R32G32B32_SFLOAT => 12,
            VertexFormat::R32G32B32A32_SFLOAT => 16,
        }
    }
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Attribute location in shader
    pub location: u32,
    pub binding: u32,
    pub format: VertexFormat,
    /// Offset in bytes from the start of the vertex
    pub offset: u32,
}

/// Per-vertex buffer binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBinding {
    pub binding: u32,
    pub stride: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexLayout {
    pub bindings: Vec<VertexBinding>,
    pub attributes: Vec<VertexAttribute>,
}

/// The single vertex format every pipeline is built for
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub color: Vec3,
}

impl Vertex {
    pub fn layout() -> VertexLayout {
        VertexLayout {
            bindings: vec![VertexBinding {
                binding: 0,
                stride: std::mem::size_of::<Vertex>() as u32,
            }],
            attributes: vec![
                VertexAttribute {
                    location: 0,
                    binding: 0,
                    format: VertexFormat::R32G32B32_SFLOAT,
                    offset: std::mem::offset_of!(Vertex, position) as u32,
                },
                VertexAttribute {
                    location: 1,
                    binding: 0,
                    format: VertexFormat::R32G32B32_SFLOAT,
                    offset: std::mem::offset_of!(Vertex, color) as u32,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    Clockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonMode {
    Fill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterizationState {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub polygon_mode: PolygonMode,
}

impl Default for RasterizationState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::Clockwise,
            polygon_mode: PolygonMode::Fill,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendOp {
    Add,
}

bitflags! {
    /// Color channels written by the pipeline
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ColorWriteMask: u8 {
        const R = 0b0001;
        const G = 0b0010;
        const B = 0b0100;
        const A = 0b1000;
    }
}

/// Color blending of the single attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorBlendState {
    pub blend_enable: bool,
    pub src_color_factor: BlendFactor,
    pub dst_color_factor: BlendFactor,
    pub color_blend_op: BlendOp,
    pub src_alpha_factor: BlendFactor,
    pub dst_alpha_factor: BlendFactor,
    pub alpha_blend_op: BlendOp,
    pub color_write_mask: ColorWriteMask,
}

impl Default for ColorBlendState {
    /// `src*srcAlpha + dst*(1-srcAlpha)` for color, `src*1 + dst*0` for alpha
    fn default() -> Self {
        Self {
            blend_enable: true,
            src_color_factor: BlendFactor::SrcAlpha,
            dst_color_factor: BlendFactor::OneMinusSrcAlpha,
            color_blend_op: BlendOp::Add,
            src_alpha_factor: BlendFactor::One,
            dst_alpha_factor: BlendFactor::Zero,
            alpha_blend_op: BlendOp::Add,
            color_write_mask: ColorWriteMask::all(),
        }
    }
}

/// Descriptor for creating a graphics pipeline
///
/// Viewport and scissor are always dynamic. The layout carries no descriptor
/// sets and no push constants.
pub struct PipelineDesc<'a> {
    pub vertex_shader: &'a dyn Shader,
    pub fragment_shader: &'a dyn Shader,
    pub vertex_layout: VertexLayout,
    pub topology: PrimitiveTopology,
    pub rasterization: RasterizationState,
    pub color_blend: ColorBlendState,
    /// Render pass the pipeline will be used in (subpass 0)
    pub render_pass: &'a dyn RenderPass,
}

impl<'a> PipelineDesc<'a> {
    /// Fixed-function state shared by every pipeline of the engine
    pub fn fixed(
        vertex_shader: &'a dyn Shader,
        fragment_shader: &'a dyn Shader,
        render_pass: &'a dyn RenderPass,
    ) -> Self {
        Self {
            vertex_shader,
            fragment_shader,
            vertex_layout: Vertex::layout(),
            topology: PrimitiveTopology::TriangleList,
            rasterization: RasterizationState::default(),
            color_blend: ColorBlendState::default(),
            render_pass,
        }
    }
}

/// Compiled graphics pipeline (owns its layout)
pub trait Pipeline: AsAny + Send + Sync {}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
