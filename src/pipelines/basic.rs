use crate::data_structures::{
    instance::InstanceRaw,
    model::{self, Vertex},
};

/// Colour target and winding of a render pass.
///
/// Capture passes render through a mirrored projection, which turns counter-clockwise
/// triangles clockwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassTarget {
    pub color_format: wgpu::TextureFormat,
    pub front_face: wgpu::FrontFace,
}

/// How a pipeline uses the depth buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthMode {
    pub write: bool,
    pub compare: wgpu::CompareFunction,
}

impl DepthMode {
    pub const OPAQUE: DepthMode = DepthMode {
        write: true,
        compare: wgpu::CompareFunction::Less,
    };
    /// Never occludes anything and is never occluded.
    pub const BACKDROP: DepthMode = DepthMode {
        write: false,
        compare: wgpu::CompareFunction::Always,
    };
}

/// Vertex buffers of every mesh pipeline: the geometry in slot 0, the node transform in slot 1.
pub fn mesh_vertex_layouts() -> [wgpu::VertexBufferLayout<'static>; 2] {
    [model::ModelVertex::desc(), InstanceRaw::desc()]
}

#[allow(clippy::too_many_arguments)]
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    target: PassTarget,
    blend: Option<wgpu::BlendState>,
    depth_format: Option<wgpu::TextureFormat>,
    depth: DepthMode,
    cull_mode: Option<wgpu::Face>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: target.color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: target.front_face,
            cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: Some(depth.write),
            depth_compare: Some(depth.compare),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}
