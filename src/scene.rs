//! The gallery scene and its per-frame tick.
//!
//! [`Scene`] is what a renderer reads: the graph, the background panorama and
//! the currently published reflection capture. [`GalleryScene`] wraps it with
//! the cameras, the animated objects and the loaded model, and drives one frame
//! through a [`SceneRenderer`].

use std::sync::Arc;

use cgmath::{Quaternion, Rad, Rotation3};

use crate::{
    camera::{OrbitControls, PerspectiveCamera},
    config::{ModelPlacement, SceneConfig, Tuning},
    data_structures::{
        geometry::{torus, torus_knot},
        instance::Instance,
        material::{color_from_hex, update_all_materials, Material},
        scene_graph::{Layers, Node, NodeId, SceneGraph},
        texture_data::TextureData,
    },
    reflection::CubeCamera,
    render::SceneRenderer,
    resources::LoadedModel,
};

/// What physically-lit materials use as their environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvironmentSlot {
    /// Nothing captured yet; lit surfaces read a black environment.
    #[default]
    None,
    /// The reflection capture with the given generation.
    Captured { generation: u64 },
}

#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub graph: SceneGraph,
    /// Equirectangular panorama drawn behind everything.
    pub background: Option<Arc<TextureData>>,
    pub environment: EnvironmentSlot,
}

/// Seconds since the scene started.
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    start: instant::Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            start: instant::Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

pub struct GalleryScene {
    pub scene: Scene,
    pub camera: PerspectiveCamera,
    pub controls: OrbitControls,
    pub cube_camera: CubeCamera,
    holy_donut: Option<NodeId>,
    torus_knot: Option<NodeId>,
    model: Option<NodeId>,
    placement: ModelPlacement,
    clock: Clock,
}

impl GalleryScene {
    /// The full gallery: cameras, the glowing donut and the mirror knot.
    /// The model and the background arrive later through the loaders.
    pub fn new(config: &SceneConfig, aspect: f32) -> Self {
        let mut gallery = Self::empty(config, aspect);
        gallery.add_holy_donut();
        gallery.add_torus_knot();
        gallery
    }

    /// Cameras only, no objects.
    pub fn empty(config: &SceneConfig, aspect: f32) -> Self {
        let mut camera = PerspectiveCamera::from_config(&config.camera, aspect);
        let mut controls = OrbitControls::from_config(&config.controls);
        // look at the target from the first frame on
        controls.update(&mut camera);
        Self {
            scene: Scene::default(),
            camera,
            controls,
            cube_camera: CubeCamera::from_config(&config.reflection),
            holy_donut: None,
            torus_knot: None,
            model: None,
            placement: config.model.clone(),
            clock: Clock::new(),
        }
    }

    /// Adds the unlit ring that lights the scene through the reflection capture.
    pub fn add_holy_donut(&mut self) -> NodeId {
        if let Some(id) = self.holy_donut {
            return id;
        }
        let node = Node::new("holy donut")
            .with_mesh(
                Arc::new(torus(8.0, 0.5, 12, 48)),
                Material::basic("holy donut", [10.0, 4.0, 2.0]),
            )
            .with_transform(Instance::new().with_position([-4.0, 0.0, -4.0]))
            .with_layers(Layers::DEFAULT | Layers::REFLECTION);
        let graph = &mut self.scene.graph;
        let id = graph.add(graph.root(), node);
        graph.update_world_transforms();
        self.holy_donut = Some(id);
        id
    }

    pub fn add_torus_knot(&mut self) -> NodeId {
        if let Some(id) = self.torus_knot {
            return id;
        }
        let material = Material::standard("torus knot")
            .with_color(color_from_hex(0xaaaaaa))
            .with_roughness(0.0)
            .with_metalness(1.0);
        let node = Node::new("torus knot")
            .with_mesh(Arc::new(torus_knot(1.0, 0.4, 100, 16, 2, 3)), material)
            .with_transform(Instance::new().with_position([-4.0, 0.0, 0.0]));
        let graph = &mut self.scene.graph;
        let id = graph.add(graph.root(), node);
        graph.update_world_transforms();
        self.torus_knot = Some(id);
        id
    }

    /**
     * Places a loaded model, appends it under the root and runs the material pass.
     *
     * The model's own root transform is replaced by the configured placement.
     */
    pub fn attach_model(&mut self, model: LoadedModel, tuning: &Tuning) -> NodeId {
        let LoadedModel { name, mut graph } = model;
        let root = graph.root();
        if let Some(node) = graph.get_mut(root) {
            node.transform = Instance::new()
                .with_scale(self.placement.scale)
                .with_position(self.placement.position)
                .with_rotation_y(self.placement.rotation_y);
        }
        let nodes = graph.len();
        let scene_graph = &mut self.scene.graph;
        let id = scene_graph.append(scene_graph.root(), graph);
        scene_graph.update_world_transforms();
        update_all_materials(scene_graph, tuning);
        log::info!("Model {name} attached with {nodes} nodes");
        self.model = Some(id);
        id
    }

    pub fn set_background(&mut self, texture: TextureData) {
        log::info!("Background {} set", texture.label);
        self.scene.background = Some(Arc::new(texture));
    }

    pub fn holy_donut(&self) -> Option<NodeId> {
        self.holy_donut
    }

    pub fn torus_knot(&self) -> Option<NodeId> {
        self.torus_knot
    }

    pub fn model(&self) -> Option<NodeId> {
        self.model
    }

    /// Runs one frame at the current clock time.
    pub fn tick<R>(&mut self, renderer: &mut R, tuning: &Tuning) -> anyhow::Result<()>
    where
        R: SceneRenderer + ?Sized,
    {
        let elapsed = self.clock.elapsed_secs();
        self.frame(renderer, tuning, elapsed)
    }

    /**
     * Runs one frame at `elapsed` seconds: animate, capture, update controls, draw.
     *
     * A failed capture ends the frame before the draw; the next frame starts over.
     */
    pub fn frame<R>(
        &mut self,
        renderer: &mut R,
        tuning: &Tuning,
        elapsed: f32,
    ) -> anyhow::Result<()>
    where
        R: SceneRenderer + ?Sized,
    {
        if let Some(donut) = self.holy_donut {
            if let Some(node) = self.scene.graph.get_mut(donut) {
                node.transform.rotation = Quaternion::from_angle_x(Rad(elapsed.sin() * 2.0));
            }
            self.scene.graph.update_world_transforms();
        }

        self.cube_camera.update(renderer, &mut self.scene, tuning)?;

        self.controls.update(&mut self.camera);

        renderer.render(&self.scene, &self.camera, tuning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gallery_objects_are_added_once() {
        let mut gallery = GalleryScene::new(&SceneConfig::default(), 1.0);
        let nodes = gallery.scene.graph.len();
        assert_eq!(gallery.add_holy_donut(), gallery.holy_donut().unwrap());
        assert_eq!(gallery.add_torus_knot(), gallery.torus_knot().unwrap());
        assert_eq!(gallery.scene.graph.len(), nodes);
    }

    #[test]
    fn donut_is_seen_by_both_cameras_and_knot_only_by_main() {
        let gallery = GalleryScene::new(&SceneConfig::default(), 1.0);
        let graph = &gallery.scene.graph;
        let donut = graph.get(gallery.holy_donut().unwrap()).unwrap();
        assert!(donut.layers.contains(Layers::DEFAULT | Layers::REFLECTION));
        let knot = graph.get(gallery.torus_knot().unwrap()).unwrap();
        assert_eq!(knot.layers, Layers::DEFAULT);
        assert!(knot.mesh.as_ref().unwrap().material.is_physically_lit());
    }

    #[test]
    fn camera_starts_looking_at_the_controls_target() {
        let gallery = GalleryScene::empty(&SceneConfig::default(), 1.0);
        assert_eq!(gallery.camera.target, gallery.controls.target);
        assert_eq!(gallery.scene.environment, EnvironmentSlot::None);
    }
}
