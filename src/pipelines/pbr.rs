use crate::{
    data_structures::{material::Material, texture::Texture},
    pipelines::basic::{self, DepthMode, PassTarget},
};

/// Material parameters as laid out in the shaders (group 1, binding 0).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    base_color: [f32; 4],
    // vec4 for the 16 byte uniform alignment, alpha unused
    emissive: [f32; 4],
    roughness: f32,
    metalness: f32,
    env_map_intensity: f32,
    _padding: f32,
}

impl MaterialUniform {
    pub fn new(material: &Material) -> Self {
        let [r, g, b] = material.emissive;
        Self {
            base_color: material.base_color,
            emissive: [r, g, b, 0.0],
            roughness: material.roughness,
            metalness: material.metalness,
            env_map_intensity: material.env_map_intensity,
            _padding: 0.0,
        }
    }
}

/// Uniform, base colour texture and its sampler. Shared with the unlit pipeline.
pub fn mk_material_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

/// The environment cube lit surfaces reflect.
pub fn mk_environment_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::Cube,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("environment_bind_group_layout"),
    })
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    target: PassTarget,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    material_bind_group_layout: &wgpu::BindGroupLayout,
    environment_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("PBR Pipeline Layout"),
        bind_group_layouts: &[
            Some(camera_bind_group_layout),
            Some(material_bind_group_layout),
            Some(environment_bind_group_layout),
        ],
        immediate_size: 0,
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("PBR Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("pbr.wgsl").into()),
    };
    basic::mk_render_pipeline(
        device,
        "PBR Pipeline",
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_matches_the_shader_layout() {
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 48);
    }

    #[test]
    fn uniform_carries_the_environment_intensity() {
        let mut material = Material::standard("knot").with_metalness(1.0);
        material.env_map_intensity = 2.5;
        let uniform = MaterialUniform::new(&material);
        assert_eq!(uniform.env_map_intensity, 2.5);
        assert_eq!(uniform.metalness, 1.0);
        assert_eq!(uniform.emissive, [0.0; 4]);
    }
}
