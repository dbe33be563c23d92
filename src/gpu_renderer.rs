//! The wgpu implementation of [`SceneRenderer`].
//!
//! CPU-side scene data is uploaded lazily the first time it is drawn and cached:
//! geometry buffers by [`GeometryId`], textures by [`TextureId`], per-node
//! transform and material buffers by [`NodeId`]. Transforms and material
//! parameters are rewritten every frame since both change at runtime (the donut
//! spins, the debug panel changes intensities).
//!
//! The debug panel is painted by `egui_wgpu` in a second pass over the frame.

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::{
    camera::{CameraUniform, PerspectiveCamera},
    config::Tuning,
    context::Context,
    debug::UiFrame,
    data_structures::{
        material::Shading,
        model::{Geometry, GeometryId},
        scene_graph::NodeId,
        texture::{create_default_sampler, CubeTexture, Texture},
        texture_data::{TextureData, TextureId},
    },
    pipelines::{background::BackgroundUniform, pbr::MaterialUniform, PassPipelines, Pipelines},
    reflection::{CubeCamera, CubeFace},
    render::{collect_draw_items, DrawItem, SceneRenderer},
    scene::{EnvironmentSlot, Scene},
};

/// Camera buffer of the main view; capture faces follow at `1 + face layer`.
const MAIN_CAMERA: usize = 0;
const CAMERA_SLOTS: usize = 1 + CubeFace::ALL.len();

#[derive(Debug)]
struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_elements: u32,
}

#[derive(Debug)]
struct NodeResources {
    instance_buffer: wgpu::Buffer,
    material_buffer: wgpu::Buffer,
    material_bind_group: wgpu::BindGroup,
    /// Texture the bind group was created with.
    texture: Option<TextureId>,
}

#[derive(Debug)]
struct CameraSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug)]
struct BackgroundResources {
    texture: TextureId,
    mip_level_count: u32,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// What one render pass draws.
struct PassDraws<'a> {
    pipelines: &'a PassPipelines,
    camera: &'a wgpu::BindGroup,
    environment: &'a wgpu::BindGroup,
    background: Option<&'a wgpu::BindGroup>,
    items: &'a [DrawItem<'a>],
}

pub struct GpuRenderer {
    pub ctx: Context,
    pipelines: Pipelines,
    cameras: Vec<CameraSlot>,
    default_sampler: wgpu::Sampler,
    white: Texture,
    black_environment: wgpu::BindGroup,
    capture: CubeTexture,
    capture_depth: Texture,
    captured_environment: wgpu::BindGroup,
    geometries: HashMap<GeometryId, GpuGeometry>,
    textures: HashMap<TextureId, Texture>,
    nodes: HashMap<NodeId, NodeResources>,
    background: Option<BackgroundResources>,
    ui_renderer: egui_wgpu::Renderer,
    reconfigure_after_present: bool,
    /// Painted over the next frame, then dropped.
    overlay: Option<UiFrame>,
}

impl GpuRenderer {
    pub fn new(ctx: Context, capture_resolution: u32) -> Self {
        let device = &ctx.device;
        let pipelines = Pipelines::new(device, ctx.config.format);

        let cameras = (0..CAMERA_SLOTS)
            .map(|slot| {
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("Camera Buffer {slot}")),
                    contents: bytemuck::cast_slice(&[CameraUniform::new(
                        cgmath::SquareMatrix::identity(),
                        cgmath::Point3::new(0.0, 0.0, 0.0),
                    )]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    layout: &pipelines.layouts.camera,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                    label: Some("camera_bind_group"),
                });
                CameraSlot { buffer, bind_group }
            })
            .collect();

        let default_sampler = create_default_sampler(device);
        let white = Texture::solid_color(device, &ctx.queue, [255, 255, 255, 255], "white");
        let black = CubeTexture::create_black(device, &ctx.queue);
        let black_environment = mk_environment_bind_group(device, &pipelines, &black);
        let capture = CubeTexture::create_capture_target(device, capture_resolution);
        let capture_depth = Texture::create_depth_texture(
            device,
            [capture_resolution, capture_resolution],
            "capture_depth_texture",
        );
        let captured_environment = mk_environment_bind_group(device, &pipelines, &capture);
        log::info!("Reflection capture target {capture_resolution}x{capture_resolution} created");
        let ui_renderer = egui_wgpu::Renderer::new(
            device,
            ctx.config.format,
            egui_wgpu::RendererOptions::default(),
        );

        Self {
            ctx,
            pipelines,
            cameras,
            default_sampler,
            white,
            black_environment,
            capture,
            capture_depth,
            captured_environment,
            geometries: HashMap::new(),
            textures: HashMap::new(),
            nodes: HashMap::new(),
            background: None,
            ui_renderer,
            reconfigure_after_present: false,
            overlay: None,
        }
    }

    /// Sets the widgets drawn on top of the next rendered frame.
    pub fn set_overlay(&mut self, frame: UiFrame) {
        self.overlay = Some(frame);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
    }

    fn ensure_capture_resolution(&mut self, resolution: u32) {
        let current = self.capture.texture.width();
        if current == resolution.max(1) {
            return;
        }
        log::info!("Reflection capture resized from {current} to {resolution}");
        let device = &self.ctx.device;
        self.capture = CubeTexture::create_capture_target(device, resolution);
        self.capture_depth = Texture::create_depth_texture(
            device,
            [resolution, resolution],
            "capture_depth_texture",
        );
        self.captured_environment =
            mk_environment_bind_group(device, &self.pipelines, &self.capture);
    }

    fn write_camera(&self, slot: usize, uniform: CameraUniform) {
        self.ctx
            .queue
            .write_buffer(&self.cameras[slot].buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    fn ensure_texture(&mut self, data: &TextureData) -> anyhow::Result<()> {
        if !self.textures.contains_key(&data.id()) {
            let texture = Texture::from_texture_data(&self.ctx.device, &self.ctx.queue, data)?;
            log::debug!("Uploaded texture {}", data.label);
            self.textures.insert(data.id(), texture);
        }
        Ok(())
    }

    fn ensure_geometry(&mut self, geometry: &Geometry) {
        if self.geometries.contains_key(&geometry.id()) {
            return;
        }
        let device = &self.ctx.device;
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", geometry.name)),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", geometry.name)),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        log::debug!(
            "Uploaded geometry {} ({} vertices)",
            geometry.name,
            geometry.vertices.len()
        );
        self.geometries.insert(
            geometry.id(),
            GpuGeometry {
                vertex_buffer,
                index_buffer,
                num_elements: geometry.num_elements(),
            },
        );
    }

    /// Uploads whatever `items` need and writes their current transforms and materials.
    fn prepare_items(&mut self, items: &[DrawItem]) -> anyhow::Result<()> {
        for item in items {
            self.ensure_geometry(&item.mesh.geometry);
            let material = &item.mesh.material;
            let texture = material.base_color_texture.as_deref();
            if let Some(texture) = texture {
                self.ensure_texture(texture)?;
            }
            let texture_id = texture.map(TextureData::id);

            let stale = self
                .nodes
                .get(&item.node)
                .is_none_or(|node| node.texture != texture_id);
            if stale {
                let resources = self.mk_node_resources(item, texture_id);
                self.nodes.insert(item.node, resources);
            }
            if let Some(node) = self.nodes.get(&item.node) {
                let queue = &self.ctx.queue;
                queue.write_buffer(
                    &node.instance_buffer,
                    0,
                    bytemuck::cast_slice(&[item.world.to_raw()]),
                );
                queue.write_buffer(
                    &node.material_buffer,
                    0,
                    bytemuck::cast_slice(&[MaterialUniform::new(material)]),
                );
            }
        }
        Ok(())
    }

    fn mk_node_resources(&self, item: &DrawItem, texture: Option<TextureId>) -> NodeResources {
        let device = &self.ctx.device;
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Instance Buffer"),
            contents: bytemuck::cast_slice(&[item.world.to_raw()]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let material_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Material Buffer"),
            contents: bytemuck::cast_slice(&[MaterialUniform::new(&item.mesh.material)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let base = texture
            .and_then(|id| self.textures.get(&id))
            .unwrap_or(&self.white);
        let material_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.pipelines.layouts.material,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: material_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&base.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(
                        base.sampler.as_ref().unwrap_or(&self.default_sampler),
                    ),
                },
            ],
            label: Some(&format!("{} material_bind_group", item.mesh.material.name)),
        });
        NodeResources {
            instance_buffer,
            material_buffer,
            material_bind_group,
            texture,
        }
    }

    /// Returns whether a background is ready to draw.
    fn prepare_background(&mut self, scene: &Scene, tuning: &Tuning) -> anyhow::Result<bool> {
        let Some(data) = scene.background.as_deref() else {
            return Ok(false);
        };
        self.ensure_texture(data)?;
        let stale = self
            .background
            .as_ref()
            .is_none_or(|background| background.texture != data.id());
        if stale {
            let Some(texture) = self.textures.get(&data.id()) else {
                return Ok(false);
            };
            let mip_level_count = texture.texture.mip_level_count();
            let device = &self.ctx.device;
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Background Buffer"),
                contents: bytemuck::cast_slice(&[BackgroundUniform::new(tuning, mip_level_count)]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &self.pipelines.layouts.background,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(
                            texture.sampler.as_ref().unwrap_or(&self.default_sampler),
                        ),
                    },
                ],
                label: Some("background_bind_group"),
            });
            self.background = Some(BackgroundResources {
                texture: data.id(),
                mip_level_count,
                buffer,
                bind_group,
            });
        }
        if let Some(background) = &self.background {
            self.ctx.queue.write_buffer(
                &background.buffer,
                0,
                bytemuck::cast_slice(&[BackgroundUniform::new(tuning, background.mip_level_count)]),
            );
        }
        Ok(true)
    }

    fn record_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        color: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        draws: PassDraws,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
            multiview_mask: None,
        });

        render_pass.set_bind_group(0, draws.camera, &[]);

        if let Some(background) = draws.background {
            render_pass.set_pipeline(&draws.pipelines.background);
            render_pass.set_bind_group(1, background, &[]);
            render_pass.draw(0..3, 0..1);
        }

        for (shading, pipeline) in [
            (Shading::Standard, &draws.pipelines.pbr),
            (Shading::Basic, &draws.pipelines.unlit),
        ] {
            render_pass.set_pipeline(pipeline);
            if shading == Shading::Standard {
                render_pass.set_bind_group(2, draws.environment, &[]);
            }
            for item in draws.items.iter().filter(|item| item.shading() == shading) {
                let (Some(geometry), Some(node)) = (
                    self.geometries.get(&item.mesh.geometry.id()),
                    self.nodes.get(&item.node),
                ) else {
                    continue;
                };
                if geometry.num_elements == 0 {
                    continue;
                }
                render_pass.set_bind_group(1, &node.material_bind_group, &[]);
                render_pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
                render_pass.set_vertex_buffer(1, node.instance_buffer.slice(..));
                render_pass
                    .set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..geometry.num_elements, 0, 0..1);
            }
        }
    }

    /// Paints `frame` over `view` without clearing it. Returns the command
    /// buffers egui recorded for its own uploads, which must be submitted first.
    fn record_overlay(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        frame: UiFrame,
    ) -> Vec<wgpu::CommandBuffer> {
        let (device, queue) = (&self.ctx.device, &self.ctx.queue);
        for (id, image_delta) in &frame.textures_delta.set {
            self.ui_renderer.update_texture(device, queue, *id, image_delta);
        }
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.ctx.config.width, self.ctx.config.height],
            pixels_per_point: frame.pixels_per_point,
        };
        let uploads =
            self.ui_renderer.update_buffers(device, queue, encoder, &frame.paint_jobs, &screen);
        {
            let mut render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Debug Panel Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    ..Default::default()
                })
                .forget_lifetime();
            self.ui_renderer.render(&mut render_pass, &frame.paint_jobs, &screen);
        }
        for id in &frame.textures_delta.free {
            self.ui_renderer.free_texture(id);
        }
        uploads
    }
}

fn mk_environment_bind_group(
    device: &wgpu::Device,
    pipelines: &Pipelines,
    cube: &CubeTexture,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &pipelines.layouts.environment,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&cube.cube_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&cube.sampler),
            },
        ],
        label: Some("environment_bind_group"),
    })
}

impl SceneRenderer for GpuRenderer {
    fn render_cube(
        &mut self,
        scene: &Scene,
        rig: &CubeCamera,
        tuning: &Tuning,
    ) -> anyhow::Result<()> {
        self.ensure_capture_resolution(rig.target().resolution);
        let items = collect_draw_items(&scene.graph, rig.layers);
        self.prepare_items(&items)?;
        let has_background = self.prepare_background(scene, tuning)?;
        for face in CubeFace::ALL {
            self.write_camera(1 + face.layer() as usize, rig.face_uniform(face));
        }

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Capture Encoder"),
            });
        for face in CubeFace::ALL {
            let layer = face.layer() as usize;
            self.record_pass(
                &mut encoder,
                "Capture Pass",
                &self.capture.face_views[layer],
                &self.capture_depth.view,
                PassDraws {
                    pipelines: &self.pipelines.capture,
                    camera: &self.cameras[1 + layer].bind_group,
                    // the target cannot be sampled while it is written
                    environment: &self.black_environment,
                    background: has_background
                        .then(|| self.background.as_ref().map(|b| &b.bind_group))
                        .flatten(),
                    items: &items,
                },
            );
        }
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn render(
        &mut self,
        scene: &Scene,
        camera: &PerspectiveCamera,
        tuning: &Tuning,
    ) -> anyhow::Result<()> {
        if !self.ctx.is_surface_configured() {
            return Ok(());
        }
        let items = collect_draw_items(&scene.graph, camera.layers);
        self.prepare_items(&items)?;
        let has_background = self.prepare_background(scene, tuning)?;
        self.write_camera(MAIN_CAMERA, camera.to_uniform());

        let output = match self.ctx.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(output) => output,
            wgpu::CurrentSurfaceTexture::Suboptimal(output) => {
                log::debug!("Surface is suboptimal, reconfiguring after this frame");
                self.reconfigure_after_present = true;
                output
            }
            // Reconfigure the surface if it's lost or outdated
            wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.ctx.reconfigure();
                return Ok(());
            }
            wgpu::CurrentSurfaceTexture::Timeout | wgpu::CurrentSurfaceTexture::Occluded => {
                log::debug!("No frame available, skipping");
                return Ok(());
            }
            wgpu::CurrentSurfaceTexture::Validation => {
                anyhow::bail!("cannot acquire the next frame: surface validation failed")
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let environment = match scene.environment {
            EnvironmentSlot::Captured { .. } => &self.captured_environment,
            EnvironmentSlot::None => &self.black_environment,
        };
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        self.record_pass(
            &mut encoder,
            "Render Pass",
            &view,
            &self.ctx.depth_texture.view,
            PassDraws {
                pipelines: &self.pipelines.main,
                camera: &self.cameras[MAIN_CAMERA].bind_group,
                environment,
                background: has_background
                    .then(|| self.background.as_ref().map(|b| &b.bind_group))
                    .flatten(),
                items: &items,
            },
        );
        let uploads = match self.overlay.take() {
            Some(frame) => self.record_overlay(&mut encoder, &view, frame),
            None => Vec::new(),
        };
        self.ctx
            .queue
            .submit(uploads.into_iter().chain(std::iter::once(encoder.finish())));
        output.present();
        if std::mem::take(&mut self.reconfigure_after_present) {
            self.ctx.reconfigure();
        }
        Ok(())
    }
}
