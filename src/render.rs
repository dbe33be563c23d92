//! Renderer abstraction and draw-list collection.
//!
//! The render loop and the reflection capture only talk to a [`SceneRenderer`].
//! The GPU implementation lives in [`crate::gpu_renderer`]; anything else that
//! implements the trait (e.g. a recorder in tests) can drive the same loop.
//!
//! # Key types
//!
//! - [`SceneRenderer`] renders a scene through the main camera or into the
//!   six faces of a reflection capture rig
//! - [`DrawItem`] is one visible mesh with its world transform, as selected by
//!   [`collect_draw_items`] for a camera's layer mask

use crate::{
    camera::PerspectiveCamera,
    config::Tuning,
    data_structures::{
        instance::Instance,
        material::Shading,
        scene_graph::{Layers, Mesh, NodeId, SceneGraph},
    },
    reflection::CubeCamera,
    scene::Scene,
};

pub trait SceneRenderer {
    /// Renders `scene` from all six faces of `rig` into its capture target.
    ///
    /// Must only return `Ok` once the capture is complete, so that whatever is
    /// drawn next can read it.
    fn render_cube(
        &mut self,
        scene: &Scene,
        rig: &CubeCamera,
        tuning: &Tuning,
    ) -> anyhow::Result<()>;

    /// Draws `scene` as seen by `camera`.
    fn render(
        &mut self,
        scene: &Scene,
        camera: &PerspectiveCamera,
        tuning: &Tuning,
    ) -> anyhow::Result<()>;
}

/// A mesh that passed visibility and layer filtering.
#[derive(Clone, Copy, Debug)]
pub struct DrawItem<'a> {
    pub node: NodeId,
    pub mesh: &'a Mesh,
    pub world: &'a Instance,
}

impl DrawItem<'_> {
    pub fn shading(&self) -> Shading {
        self.mesh.material.shading
    }
}

/**
 * Every visible mesh whose layer mask intersects `layers`, in traversal order.
 *
 * Invisible nodes hide their subtree. Layers are not inherited: a child on another layer
 * than its parent is filtered on its own mask.
 */
pub fn collect_draw_items(graph: &SceneGraph, layers: Layers) -> Vec<DrawItem<'_>> {
    let mut items = Vec::new();
    let mut stack = vec![graph.root()];
    while let Some(id) = stack.pop() {
        let Some(node) = graph.get(id) else {
            continue;
        };
        if !node.visible {
            continue;
        }
        if let Some(mesh) = &node.mesh {
            if node.layers.intersects(layers) {
                items.push(DrawItem {
                    node: id,
                    mesh,
                    world: node.world_transform(),
                });
            }
        }
        stack.extend(node.children().iter().rev().copied());
    }
    items
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data_structures::{
        geometry::torus,
        material::Material,
        scene_graph::Node,
    };

    #[test]
    fn filters_by_layer_and_visibility() {
        let geometry = Arc::new(torus(1.0, 0.2, 3, 3));
        let mut graph = SceneGraph::default();
        let lit = Material::standard("lit");
        graph.add(
            graph.root(),
            Node::new("both")
                .with_mesh(geometry.clone(), lit.clone())
                .with_layers(Layers::DEFAULT | Layers::REFLECTION),
        );
        graph.add(graph.root(), Node::new("main").with_mesh(geometry.clone(), lit.clone()));
        let mut hidden = Node::new("hidden group");
        hidden.visible = false;
        let hidden = graph.add(graph.root(), hidden);
        graph.add(hidden, Node::new("hidden child").with_mesh(geometry, lit));

        let main: Vec<_> = collect_draw_items(&graph, Layers::DEFAULT)
            .iter()
            .map(|item| graph.get(item.node).unwrap().name.clone())
            .collect();
        assert_eq!(main, vec!["both", "main"]);

        let captured = collect_draw_items(&graph, Layers::REFLECTION);
        assert_eq!(captured.len(), 1);
        assert_eq!(graph.get(captured[0].node).unwrap().name, "both");
    }
}
