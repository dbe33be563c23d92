//! Surface materials and the pass that keeps them in sync with [`Tuning`].

use std::sync::Arc;

use crate::{config::Tuning, data_structures::scene_graph::SceneGraph};

use super::texture_data::TextureData;

/// Shading model of a surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Shading {
    /// Metallic-roughness surface lit by the scene environment.
    #[default]
    Standard,
    /// Unlit surface that outputs its base colour as is.
    Basic,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub shading: Shading,
    /// Linear RGBA. Unlit materials may go above 1 to act as light sources
    /// in the reflection capture.
    pub base_color: [f32; 4],
    pub base_color_texture: Option<Arc<TextureData>>,
    pub emissive: [f32; 3],
    pub roughness: f32,
    pub metalness: f32,
    pub env_map_intensity: f32,
}

impl Material {
    /// A physically-lit material with the usual defaults (white, rough, dielectric).
    pub fn standard(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shading: Shading::Standard,
            base_color: [1.0, 1.0, 1.0, 1.0],
            base_color_texture: None,
            emissive: [0.0; 3],
            roughness: 1.0,
            metalness: 0.0,
            env_map_intensity: 1.0,
        }
    }

    /// An unlit material of a single colour.
    pub fn basic(name: impl Into<String>, color: [f32; 3]) -> Self {
        Self {
            shading: Shading::Basic,
            base_color: [color[0], color[1], color[2], 1.0],
            ..Self::standard(name)
        }
    }

    pub fn with_color(mut self, color: [f32; 3]) -> Self {
        self.base_color = [color[0], color[1], color[2], self.base_color[3]];
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness;
        self
    }

    pub fn with_metalness(mut self, metalness: f32) -> Self {
        self.metalness = metalness;
        self
    }

    pub fn is_physically_lit(&self) -> bool {
        self.shading == Shading::Standard
    }
}

/// Converts a packed `0xRRGGBB` sRGB colour to linear RGB.
pub fn color_from_hex(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [channel(16), channel(8), channel(0)]
}

/**
 * Stamps the current environment intensity onto every physically-lit material.
 *
 * Walks the whole graph from the root. Nodes without a mesh and unlit materials are
 * skipped. Running it again without changing `tuning` changes nothing, so it is safe
 * to call after every append and on every panel change.
 */
pub fn update_all_materials(graph: &mut SceneGraph, tuning: &Tuning) {
    let mut updated = 0usize;
    let root = graph.root();
    graph.traverse_mut(root, |_, node| {
        if let Some(mesh) = node.mesh.as_mut() {
            if mesh.material.is_physically_lit() {
                mesh.material.env_map_intensity = tuning.env_map_intensity;
                updated += 1;
            }
        }
    });
    log::debug!(
        "Environment intensity {} applied to {} materials",
        tuning.env_map_intensity,
        updated
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn hex_colours_are_linearised() {
        let [r, g, b] = color_from_hex(0xaaaaaa);
        assert_relative_eq!(r, 0.402, epsilon = 1e-3);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(color_from_hex(0xffffff), [1.0, 1.0, 1.0]);
        assert_eq!(color_from_hex(0x000000), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn material_pass_only_stamps_lit_meshes() {
        use std::sync::Arc;

        use crate::data_structures::{
            geometry::torus,
            scene_graph::{Node, SceneGraph},
        };

        let geometry = Arc::new(torus(1.0, 0.2, 8, 8));
        let mut graph = SceneGraph::new("root");
        let root = graph.root();
        let group = graph.add(root, Node::new("group"));
        let lit = graph.add(
            group,
            Node::new("lit").with_mesh(geometry.clone(), Material::standard("metal")),
        );
        let unlit = graph.add(
            root,
            Node::new("unlit").with_mesh(geometry, Material::basic("glow", [2.0, 2.0, 2.0])),
        );
        let tuning = Tuning {
            env_map_intensity: 4.5,
            ..Tuning::default()
        };

        update_all_materials(&mut graph, &tuning);

        let material = |id| graph.get(id).unwrap().mesh.as_ref().unwrap().material.clone();
        assert_eq!(material(lit).env_map_intensity, 4.5);
        assert_eq!(
            material(unlit).env_map_intensity,
            Material::basic("glow", [2.0, 2.0, 2.0]).env_map_intensity
        );
    }

    #[test]
    fn materials_compare_textures_by_identity() {
        use std::sync::Arc;

        let image = image::RgbaImage::new(1, 1);
        let texture = Arc::new(TextureData::new("albedo", image.clone()));
        let mut a = Material::standard("a");
        a.base_color_texture = Some(texture.clone());
        let mut b = a.clone();
        assert_eq!(a, b);

        b.base_color_texture = Some(Arc::new(TextureData::new("albedo", image)));
        assert_ne!(a, b);
    }

    #[test]
    fn basic_keeps_colour_above_one() {
        let material = Material::basic("donut", [10.0, 4.0, 2.0]);
        assert_eq!(material.base_color, [10.0, 4.0, 2.0, 1.0]);
        assert!(!material.is_physically_lit());
    }
}
