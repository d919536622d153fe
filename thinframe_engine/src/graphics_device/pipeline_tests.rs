use crate::graphics_device::{
    Vertex, VertexFormat, ColorBlendState, BlendFactor, BlendOp, ColorWriteMask,
    RasterizationState, CullMode, FrontFace, PolygonMode,
};
use glam::Vec3;

#[test]
fn test_vertex_layout_matches_struct() {
    let layout = Vertex::layout();
    assert_eq!(layout.bindings.len(), 1);
    assert_eq!(layout.bindings[0].stride, 24);
    assert_eq!(layout.attributes.len(), 2);

    assert_eq!(layout.attributes[0].location, 0);
    assert_eq!(layout.attributes[0].offset, 0);
    assert_eq!(layout.attributes[1].location, 1);
    assert_eq!(layout.attributes[1].offset, 12);

    let total: u32 = layout.attributes.iter().map(|a| a.format.size_bytes()).sum();
    assert_eq!(total, layout.bindings[0].stride);
    assert!(layout.attributes.iter().all(|a| a.format == VertexFormat::R32G32B32_SFLOAT));
}

#[test]
fn test_vertex_is_pod() {
    let vertices = [
        Vertex { position: Vec3::new(0.0, -0.5, 0.0), color: Vec3::X },
        Vertex { position: Vec3::new(0.5, 0.5, 0.0), color: Vec3::Y },
    ];
    let bytes: &[u8] = bytemuck::cast_slice(&vertices);
    assert_eq!(bytes.len(), 48);
}

#[test]
fn test_default_blend_is_standard_alpha() {
    let blend = ColorBlendState::default();
    assert!(blend.blend_enable);
    assert_eq!(blend.src_color_factor, BlendFactor::SrcAlpha);
    assert_eq!(blend.dst_color_factor, BlendFactor::OneMinusSrcAlpha);
    assert_eq!(blend.color_blend_op, BlendOp::Add);
    assert_eq!(blend.src_alpha_factor, BlendFactor::One);
    assert_eq!(blend.dst_alpha_factor, BlendFactor::Zero);
    assert_eq!(blend.alpha_blend_op, BlendOp::Add);
    assert_eq!(blend.color_write_mask, ColorWriteMask::R | ColorWriteMask::G | ColorWriteMask::B | ColorWriteMask::A);
}

#[test]
fn test_default_rasterization() {
    let raster = RasterizationState::default();
    assert_eq!(raster.cull_mode, CullMode::Back);
    assert_eq!(raster.front_face, FrontFace::Clockwise);
    assert_eq!(raster.polygon_mode, PolygonMode::Fill);
}
