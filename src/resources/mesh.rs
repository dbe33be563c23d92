//! glTF/GLB parsing into a detached [`SceneGraph`].

use std::{collections::HashMap, path::Path, sync::Arc};

use anyhow::{bail, Context as _};

use crate::{
    data_structures::{
        instance::Instance,
        material::Material,
        model::{Geometry, ModelVertex},
        scene_graph::{Mesh, Node, NodeId, SceneGraph},
        texture_data::{ColorSpace, TextureData},
    },
    resources::texture::load_binary,
};

const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

/// A loaded model, not yet part of any scene.
#[derive(Clone, Debug)]
pub struct LoadedModel {
    pub name: String,
    /// Root node named after the file, the glTF scene nodes below it.
    pub graph: SceneGraph,
}

/// Resolves `uri` against the directory of the glTF file.
fn sibling(file_name: &str, uri: &str) -> String {
    match Path::new(file_name).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => format!("{}/{}", dir.to_string_lossy(), uri),
        _ => uri.to_string(),
    }
}

async fn load_uri(root: &str, file_name: &str, uri: &str) -> anyhow::Result<Vec<u8>> {
    if uri.starts_with("data:") {
        bail!("embedded data URIs are not supported, pack the model as GLB instead");
    }
    load_binary(root, &sibling(file_name, uri)).await
}

pub async fn load_model_gltf(root: &str, file_name: &str) -> anyhow::Result<LoadedModel> {
    let bytes = load_binary(root, file_name).await?;
    model_from_gltf_bytes(root, file_name, &bytes)
        .await
        .with_context(|| format!("cannot load model {file_name}"))
}

/**
 * Parses glTF or GLB bytes. External buffers and images are loaded relative to `file_name`.
 *
 * Meshes with several primitives become one child node per primitive, since a node carries
 * a single mesh. Primitives that are not triangle lists or lack positions are skipped.
 */
pub async fn model_from_gltf_bytes(
    root: &str,
    file_name: &str,
    bytes: &[u8],
) -> anyhow::Result<LoadedModel> {
    let gltf = match gltf::Gltf::from_slice(bytes) {
        Ok(gltf) => gltf,
        Err(e) => {
            // Validation rejects extensions the loader cannot decode; name the common one
            let draco = gltf::Gltf::from_slice_without_validation(bytes)
                .is_ok_and(|gltf| gltf.extensions_required().any(|ext| ext == DRACO_EXTENSION));
            if draco {
                bail!(
                    "{file_name} uses Draco mesh compression ({DRACO_EXTENSION}), which cannot be \
                     decoded; export the model without mesh compression"
                );
            }
            return Err(e).context("invalid glTF");
        }
    };

    // External buffers and images load concurrently
    let blob = gltf.blob.as_deref();
    let buffers = futures::future::try_join_all(gltf.buffers().map(|buffer| async move {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                blob.map(<[u8]>::to_vec).context("GLB has no binary chunk")
            }
            gltf::buffer::Source::Uri(uri) => load_uri(root, file_name, uri).await,
        }
    }))
    .await?;

    // Encoded images, decoded on first use
    let buffers_ref = &buffers;
    let images = futures::future::try_join_all(gltf.images().map(|image| async move {
        match image.source() {
            gltf::image::Source::View { view, .. } => {
                let range = view.offset()..view.offset() + view.length();
                buffers_ref
                    .get(view.buffer().index())
                    .and_then(|buffer| buffer.get(range))
                    .map(<[u8]>::to_vec)
                    .context("image view points outside its buffer")
            }
            gltf::image::Source::Uri { uri, .. } => load_uri(root, file_name, uri).await,
        }
    }))
    .await?;

    let mut builder = GraphBuilder {
        buffers: &buffers,
        images: &images,
        decoded: HashMap::new(),
        geometries: HashMap::new(),
        graph: SceneGraph::new(file_name),
    };
    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .context("glTF contains no scene")?;
    let root_id = builder.graph.root();
    for node in scene.nodes() {
        builder.add_node(root_id, &node)?;
    }
    let graph = builder.graph;
    log::info!("Parsed model {file_name}: {} nodes", graph.len());
    Ok(LoadedModel {
        name: file_name.to_string(),
        graph,
    })
}

struct GraphBuilder<'a> {
    buffers: &'a [Vec<u8>],
    images: &'a [Vec<u8>],
    decoded: HashMap<usize, Arc<TextureData>>,
    geometries: HashMap<(usize, usize), Arc<Geometry>>,
    graph: SceneGraph,
}

impl GraphBuilder<'_> {
    fn add_node(&mut self, parent: NodeId, node: &gltf::Node) -> anyhow::Result<()> {
        let (translation, [x, y, z, w], scale) = node.transform().decomposed();
        let transform = Instance {
            position: translation.into(),
            rotation: cgmath::Quaternion::new(w, x, y, z),
            scale: scale.into(),
        };
        let name = node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("node {}", node.index()));
        let id = self
            .graph
            .add(parent, Node::new(name.clone()).with_transform(transform));

        if let Some(mesh) = node.mesh() {
            let mut primitives = Vec::new();
            for primitive in mesh.primitives() {
                if let Some(geometry) = self.geometry(&mesh, &primitive) {
                    primitives.push((geometry, self.material(&primitive.material())?));
                }
            }
            if primitives.len() == 1 {
                let (geometry, material) = primitives.remove(0);
                if let Some(node) = self.graph.get_mut(id) {
                    node.mesh = Some(Mesh { geometry, material });
                }
            } else {
                for (i, (geometry, material)) in primitives.into_iter().enumerate() {
                    self.graph.add(
                        id,
                        Node::new(format!("{name} primitive {i}")).with_mesh(geometry, material),
                    );
                }
            }
        }

        for child in node.children() {
            self.add_node(id, &child)?;
        }
        Ok(())
    }

    fn geometry(
        &mut self,
        mesh: &gltf::Mesh,
        primitive: &gltf::Primitive,
    ) -> Option<Arc<Geometry>> {
        let key = (mesh.index(), primitive.index());
        if let Some(geometry) = self.geometries.get(&key) {
            return Some(geometry.clone());
        }
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "Skipping primitive {} of mesh {}: {:?} is not supported",
                primitive.index(),
                mesh.index(),
                primitive.mode()
            );
            return None;
        }
        let buffers = self.buffers;
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
        let Some(positions) = reader.read_positions() else {
            log::warn!(
                "Skipping primitive {} of mesh {}: no positions",
                primitive.index(),
                mesh.index()
            );
            return None;
        };
        let mut vertices: Vec<ModelVertex> = positions
            .map(|position| ModelVertex {
                position,
                ..Default::default()
            })
            .collect();
        if let Some(tex_coords) = reader.read_tex_coords(0) {
            vertices
                .iter_mut()
                .zip(tex_coords.into_f32())
                .for_each(|(vertex, uv)| vertex.tex_coords = uv);
        }
        let has_normals = if let Some(normals) = reader.read_normals() {
            vertices
                .iter_mut()
                .zip(normals)
                .for_each(|(vertex, normal)| vertex.normal = normal);
            true
        } else {
            false
        };
        let indices = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..vertices.len() as u32).collect(),
        };

        let name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh {}", mesh.index()));
        let mut geometry = Geometry::new(name, vertices, indices);
        if !has_normals {
            geometry.compute_vertex_normals();
        }
        let geometry = Arc::new(geometry);
        self.geometries.insert(key, geometry.clone());
        Some(geometry)
    }

    fn material(&mut self, material: &gltf::Material) -> anyhow::Result<Material> {
        let pbr = material.pbr_metallic_roughness();
        let name = material.name().unwrap_or("default").to_string();
        let mut result = Material::standard(name);
        result.base_color = pbr.base_color_factor();
        result.metalness = pbr.metallic_factor();
        result.roughness = pbr.roughness_factor();
        result.emissive = material.emissive_factor();
        if let Some(info) = pbr.base_color_texture() {
            let index = info.texture().source().index();
            result.base_color_texture = Some(self.texture(index)?);
        }
        Ok(result)
    }

    fn texture(&mut self, index: usize) -> anyhow::Result<Arc<TextureData>> {
        if let Some(texture) = self.decoded.get(&index) {
            return Ok(texture.clone());
        }
        let bytes = self
            .images
            .get(index)
            .with_context(|| format!("missing image {index}"))?;
        let image = image::load_from_memory(bytes)
            .with_context(|| format!("cannot decode image {index}"))?;
        let texture = Arc::new(
            TextureData::new(format!("image {index}"), image.to_rgba8())
                .with_color_space(ColorSpace::Srgb),
        );
        self.decoded.insert(index, texture.clone());
        Ok(texture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_files_resolve_next_to_the_model() {
        assert_eq!(sibling("models/gallery.gltf", "gallery.bin"), "models/gallery.bin");
        assert_eq!(sibling("gallery.gltf", "gallery.bin"), "gallery.bin");
    }
}
