//! Scene graph and hierarchical scene organization.
//!
//! The graph is an arena: nodes live in one `Vec` and refer to each other by
//! [`NodeId`]. A parent exclusively owns its children through its child list and
//! nodes are never removed, so ids stay valid for the lifetime of the graph.
//! Detached graphs (e.g. a freshly loaded model) are grafted in with
//! [`SceneGraph::append`].

use std::sync::Arc;

use bitflags::bitflags;

use crate::data_structures::{instance::Instance, material::Material, model::Geometry};

bitflags! {
    /// Visibility layers. A camera draws a node when their masks intersect.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Layers: u32 {
        /// Everything the main camera sees.
        const DEFAULT = 1 << 0;
        /// Everything the reflection capture sees.
        const REFLECTION = 1 << 1;
    }
}

impl Default for Layers {
    fn default() -> Self {
        Layers::DEFAULT
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Renderable surface of a node.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub geometry: Arc<Geometry>,
    pub material: Material,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    /// Transform relative to the parent.
    pub transform: Instance,
    world: Instance,
    pub mesh: Option<Mesh>,
    pub layers: Layers,
    /// Invisible nodes hide their whole subtree.
    pub visible: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Instance::default(),
            world: Instance::default(),
            mesh: None,
            layers: Layers::default(),
            visible: true,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_mesh(mut self, geometry: Arc<Geometry>, material: Material) -> Self {
        self.mesh = Some(Mesh { geometry, material });
        self
    }

    pub fn with_transform(mut self, transform: Instance) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_layers(mut self, layers: Layers) -> Self {
        self.layers = layers;
        self
    }

    /// World transform as of the last [`SceneGraph::update_world_transforms`].
    pub fn world_transform(&self) -> &Instance {
        &self.world
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Clone, Debug)]
pub struct SceneGraph {
    nodes: Vec<Node>,
}

impl SceneGraph {
    /// A graph holding only its root node.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node::new(root_name)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // The root always exists
        false
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Adds `node` as the last child of `parent`.
    ///
    /// An unknown parent falls back to the root so content never gets lost.
    pub fn add(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let parent = self.valid_or_root(parent);
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /**
     * Grafts a detached graph below `parent` and returns the new id of its root.
     *
     * All ids of `other` are shifted by the current length of `self`; the order of
     * children is preserved. The append happens in one step, there is no state in
     * which only part of `other` is attached.
     */
    pub fn append(&mut self, parent: NodeId, other: SceneGraph) -> NodeId {
        let parent = self.valid_or_root(parent);
        let offset = self.nodes.len();
        let shift = |id: NodeId| NodeId(id.0 + offset);
        self.nodes.reserve(other.nodes.len());
        for mut node in other.nodes {
            node.parent = node.parent.map(shift);
            node.children.iter_mut().for_each(|child| *child = shift(*child));
            self.nodes.push(node);
        }
        let grafted = NodeId(offset);
        self.nodes[offset].parent = Some(parent);
        self.nodes[parent.0].children.push(grafted);
        grafted
    }

    /// Pre-order depth-first walk starting at `from`.
    pub fn traverse<F>(&self, from: NodeId, mut visit: F)
    where
        F: FnMut(NodeId, &Node),
    {
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id.0) else {
                continue;
            };
            visit(id, node);
            stack.extend(node.children.iter().rev().copied());
        }
    }

    /// Like [`traverse`](Self::traverse) but with mutable access to every node.
    pub fn traverse_mut<F>(&mut self, from: NodeId, mut visit: F)
    where
        F: FnMut(NodeId, &mut Node),
    {
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id.0) else {
                continue;
            };
            stack.extend(node.children.iter().rev().copied());
            visit(id, node);
        }
    }

    /// Recomputes every world transform from the local ones, root first.
    pub fn update_world_transforms(&mut self) {
        let mut stack = vec![(self.root(), Instance::default())];
        while let Some((id, parent_world)) = stack.pop() {
            let node = &mut self.nodes[id.0];
            node.world = &parent_world * &node.transform;
            let world = node.world.clone();
            stack.extend(node.children.iter().map(|&child| (child, world.clone())));
        }
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        let mut found = None;
        self.traverse(self.root(), |id, node| {
            if found.is_none() && node.name == name {
                found = Some(id);
            }
        });
        found
    }

    fn valid_or_root(&self, id: NodeId) -> NodeId {
        if id.0 < self.nodes.len() {
            id
        } else {
            log::warn!(
                "Node {} does not exist in a graph of {} nodes, using the root instead",
                id.0,
                self.nodes.len()
            );
            self.root()
        }
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new("Scene")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn names(graph: &SceneGraph) -> Vec<String> {
        let mut names = Vec::new();
        graph.traverse(graph.root(), |_, node| names.push(node.name.clone()));
        names
    }

    #[test]
    fn traversal_is_pre_order() {
        let mut graph = SceneGraph::default();
        let a = graph.add(graph.root(), Node::new("a"));
        graph.add(a, Node::new("a1"));
        graph.add(graph.root(), Node::new("b"));
        graph.add(a, Node::new("a2"));
        assert_eq!(names(&graph), vec!["Scene", "a", "a1", "a2", "b"]);
    }

    #[test]
    fn append_shifts_ids_and_keeps_structure() {
        let mut model = SceneGraph::new("model");
        let body = model.add(model.root(), Node::new("body"));
        model.add(body, Node::new("wheel"));

        let mut graph = SceneGraph::default();
        graph.add(graph.root(), Node::new("light"));
        let grafted = graph.append(graph.root(), model);

        assert_eq!(graph.len(), 5);
        assert_eq!(graph.get(grafted).unwrap().name, "model");
        assert_eq!(graph.get(grafted).unwrap().parent(), Some(graph.root()));
        assert_eq!(names(&graph), vec!["Scene", "light", "model", "body", "wheel"]);
        let body = graph.find_by_name("body").unwrap();
        assert_eq!(graph.get(body).unwrap().parent(), Some(grafted));
    }

    #[test]
    fn world_transforms_follow_the_parent() {
        let mut graph = SceneGraph::default();
        let parent = graph.add(
            graph.root(),
            Node::new("parent").with_transform(
                Instance::new()
                    .with_position([0.0, 1.0, 0.0])
                    .with_scale([2.0, 2.0, 2.0]),
            ),
        );
        let child = graph.add(
            parent,
            Node::new("child").with_transform(Instance::new().with_position([1.0, 0.0, 0.0])),
        );
        graph.update_world_transforms();

        let world = graph.get(child).unwrap().world_transform();
        assert_relative_eq!(world.position.x, 2.0);
        assert_relative_eq!(world.position.y, 1.0);
        assert_relative_eq!(world.scale.y, 2.0);
    }

    #[test]
    fn unknown_parent_falls_back_to_root() {
        let mut graph = SceneGraph::default();
        let id = graph.add(NodeId(42), Node::new("orphan"));
        assert_eq!(graph.get(id).unwrap().parent(), Some(graph.root()));
    }

    #[test]
    fn layers_intersect_by_bit() {
        assert_eq!(Layers::default(), Layers::DEFAULT);
        assert!((Layers::DEFAULT | Layers::REFLECTION).intersects(Layers::REFLECTION));
        assert!(!Layers::DEFAULT.intersects(Layers::REFLECTION));
    }
}
