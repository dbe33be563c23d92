use crate::{
    config::Tuning,
    data_structures::texture::Texture,
    pipelines::basic::{self, DepthMode, PassTarget},
};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BackgroundUniform {
    blurriness: f32,
    intensity: f32,
    /// Highest mip level of the panorama, reached at full blurriness.
    max_lod: f32,
    _padding: f32,
}

impl BackgroundUniform {
    pub fn new(tuning: &Tuning, mip_level_count: u32) -> Self {
        Self {
            blurriness: tuning.background_blurriness,
            intensity: tuning.background_intensity,
            max_lod: mip_level_count.saturating_sub(1) as f32,
            _padding: 0.0,
        }
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
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
        label: Some("background_bind_group_layout"),
    })
}

/// Fullscreen triangle without vertex buffers, drawn before the meshes.
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    target: PassTarget,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    background_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Background Pipeline Layout"),
        bind_group_layouts: &[Some(camera_bind_group_layout), Some(background_bind_group_layout)],
        immediate_size: 0,
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Background Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("background.wgsl").into()),
    };
    basic::mk_render_pipeline(
        device,
        "Background Pipeline",
        &layout,
        target,
        Some(wgpu::BlendState::REPLACE),
        Some(Texture::DEPTH_FORMAT),
        DepthMode::BACKDROP,
        None,
        &[],
        shader,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_is_one_vec4() {
        assert_eq!(std::mem::size_of::<BackgroundUniform>(), 16);
    }

    #[test]
    fn single_level_textures_cannot_blur() {
        let tuning = Tuning {
            background_blurriness: 1.0,
            ..Default::default()
        };
        assert_eq!(BackgroundUniform::new(&tuning, 1).max_lod, 0.0);
        assert_eq!(BackgroundUniform::new(&tuning, 12).max_lod, 11.0);
    }
}
