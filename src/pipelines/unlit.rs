use crate::{
    data_structures::texture::Texture,
    pipelines::basic::{self, DepthMode, PassTarget},
};

/// Draws `Basic` materials. Uses the material layout of the PBR pipeline without the environment.
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    target: PassTarget,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    material_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Unlit Pipeline Layout"),
        bind_group_layouts: &[Some(camera_bind_group_layout), Some(material_bind_group_layout)],
        immediate_size: 0,
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Unlit Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("unlit.wgsl").into()),
    };
    basic::mk_render_pipeline(
        device,
        "Unlit Pipeline",
        &layout,
        target,
        Some(wgpu::BlendState::REPLACE),
        Some(Texture::DEPTH_FORMAT),
        DepthMode::OPAQUE,
        Some(wgpu::Face::Back),
        &basic::mesh_vertex_layouts(),
        shader,
    )
}
