//! Vertex layout and CPU-side geometry.
//!
//! A [`Geometry`] is plain vertex/index data that can be shared between nodes
//! through an `Arc`. The GPU renderer uploads each geometry once, keyed by its
//! [`GeometryId`].

use std::sync::atomic::{AtomicU64, Ordering};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(u64);

impl GeometryId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Debug)]
pub struct Geometry {
    id: GeometryId,
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn new(name: impl Into<String>, vertices: Vec<ModelVertex>, indices: Vec<u32>) -> Self {
        Self {
            id: GeometryId::next(),
            name: name.into(),
            vertices,
            indices,
        }
    }

    pub fn id(&self) -> GeometryId {
        self.id
    }

    pub fn num_elements(&self) -> u32 {
        self.indices.len() as u32
    }

    /**
     * Area-weighted smooth normals for geometry that doesn't ship its own.
     *
     * Every triangle adds its (unnormalized) face normal to its three corners, so
     * bigger faces contribute more. Vertices not referenced by any triangle keep a
     * zero normal.
     */
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![cgmath::Vector3::new(0.0f32, 0.0, 0.0); self.vertices.len()];
        for c in self.indices.chunks_exact(3) {
            let (a, b, d) = (c[0] as usize, c[1] as usize, c[2] as usize);
            if a >= self.vertices.len() || b >= self.vertices.len() || d >= self.vertices.len() {
                log::warn!("Geometry {} references vertices out of range", self.name);
                continue;
            }
            let p0: cgmath::Vector3<f32> = self.vertices[a].position.into();
            let p1: cgmath::Vector3<f32> = self.vertices[b].position.into();
            let p2: cgmath::Vector3<f32> = self.vertices[d].position.into();
            let face = (p1 - p0).cross(p2 - p0);
            normals[a] += face;
            normals[b] += face;
            normals[d] += face;
        }
        for (vertex, normal) in self.vertices.iter_mut().zip(normals) {
            use cgmath::InnerSpace;
            vertex.normal = if normal.magnitude2() > 0.0 {
                normal.normalize().into()
            } else {
                [0.0; 3]
            };
        }
    }
}
