//! Render pipelines and their bind group layouts.
//!
//! Three shaders cover everything the scene draws:
//!
//! - `pbr` lights metallic-roughness surfaces from the reflection capture
//! - `unlit` outputs the base colour as is
//! - `background` draws the equirectangular panorama behind everything
//!
//! Each shader is built twice, once for the window surface and once for the
//! faces of the reflection capture ([`PassPipelines`]).

pub mod background;
pub mod basic;
pub mod pbr;
pub mod unlit;

use basic::PassTarget;

use crate::data_structures::texture::CubeTexture;

/// Group 0 of every pipeline: the [`CameraUniform`](crate::camera::CameraUniform).
pub fn mk_camera_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("camera_bind_group_layout"),
    })
}

/// The pipelines drawing into one kind of target.
#[derive(Debug)]
pub struct PassPipelines {
    pub pbr: wgpu::RenderPipeline,
    pub unlit: wgpu::RenderPipeline,
    pub background: wgpu::RenderPipeline,
}

impl PassPipelines {
    fn new(device: &wgpu::Device, layouts: &Layouts, target: PassTarget) -> Self {
        Self {
            pbr: pbr::mk_render_pipeline(
                device,
                target,
                &layouts.camera,
                &layouts.material,
                &layouts.environment,
            ),
            unlit: unlit::mk_render_pipeline(device, target, &layouts.camera, &layouts.material),
            background: background::mk_render_pipeline(
                device,
                target,
                &layouts.camera,
                &layouts.background,
            ),
        }
    }
}

#[derive(Debug)]
pub struct Layouts {
    pub camera: wgpu::BindGroupLayout,
    pub material: wgpu::BindGroupLayout,
    pub environment: wgpu::BindGroupLayout,
    pub background: wgpu::BindGroupLayout,
}

#[derive(Debug)]
pub struct Pipelines {
    pub layouts: Layouts,
    /// Draws into the window surface.
    pub main: PassPipelines,
    /// Draws into the faces of the reflection capture.
    pub capture: PassPipelines,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let layouts = Layouts {
            camera: mk_camera_bind_group_layout(device),
            material: pbr::mk_material_bind_group_layout(device),
            environment: pbr::mk_environment_bind_group_layout(device),
            background: background::mk_bind_group_layout(device),
        };
        let main = PassPipelines::new(
            device,
            &layouts,
            PassTarget {
                color_format: surface_format,
                front_face: wgpu::FrontFace::Ccw,
            },
        );
        let capture = PassPipelines::new(
            device,
            &layouts,
            PassTarget {
                color_format: CubeTexture::CAPTURE_FORMAT,
                front_face: wgpu::FrontFace::Cw,
            },
        );
        log::info!("Render pipelines created for {:?}", surface_format);
        Self {
            layouts,
            main,
            capture,
        }
    }
}
