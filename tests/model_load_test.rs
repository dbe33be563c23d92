use approx::assert_relative_eq;
use cgmath::{InnerSpace, Quaternion, Rad, Rotation3};
use futures::executor::block_on;
use reflect_ngin::{
    config::{SceneConfig, Tuning},
    resources::model_from_gltf_bytes,
    scene::GalleryScene,
};

use crate::common::test_utils::{triangle_glb, Call, GlbOptions, RecordingRenderer};

mod common;

#[test]
fn glb_becomes_a_detached_graph() {
    let model = block_on(model_from_gltf_bytes(
        "assets",
        "models/triangle.glb",
        &triangle_glb(GlbOptions::default()),
    ))
    .unwrap();

    assert_eq!(model.name, "models/triangle.glb");
    let graph = &model.graph;
    assert_eq!(graph.get(graph.root()).unwrap().name, "models/triangle.glb");
    let node = graph.get(graph.find_by_name("triangle").unwrap()).unwrap();
    let mesh = node.mesh.as_ref().unwrap();
    assert_eq!(mesh.geometry.num_elements(), 3);
    assert_eq!(mesh.material.name, "floor");
    assert_eq!(mesh.material.base_color, [1.0, 0.5, 0.25, 1.0]);
    assert_relative_eq!(mesh.material.metalness, 0.25);
    assert_relative_eq!(mesh.material.roughness, 0.75);
    assert!(mesh.material.is_physically_lit());
}

#[test]
fn missing_normals_are_computed() {
    let model = block_on(model_from_gltf_bytes(
        "assets",
        "triangle.glb",
        &triangle_glb(GlbOptions {
            with_normals: false,
            ..Default::default()
        }),
    ))
    .unwrap();

    let graph = &model.graph;
    let node = graph.get(graph.find_by_name("triangle").unwrap()).unwrap();
    for vertex in &node.mesh.as_ref().unwrap().geometry.vertices {
        assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
    }
}

#[test]
fn draco_compressed_models_are_named_in_the_error() {
    let error = block_on(model_from_gltf_bytes(
        "assets",
        "gallery-new.glb",
        &triangle_glb(GlbOptions {
            draco: true,
            ..Default::default()
        }),
    ))
    .unwrap_err();
    let message = format!("{error:#}");
    assert!(message.contains("Draco"), "{message}");
    assert!(message.contains("gallery-new.glb"), "{message}");
}

#[test]
fn garbage_is_not_a_model() {
    assert!(block_on(model_from_gltf_bytes("assets", "broken.glb", b"glTF nonsense")).is_err());
}

#[test]
fn default_placement_matches_the_gallery_layout() {
    let mut gallery = GalleryScene::new(&SceneConfig::default(), 1.0);
    let model = block_on(model_from_gltf_bytes(
        "assets",
        "triangle.glb",
        &triangle_glb(GlbOptions::default()),
    ))
    .unwrap();

    gallery.attach_model(model, &Tuning::default());

    let graph = &gallery.scene.graph;
    let world = graph
        .get(graph.find_by_name("triangle").unwrap())
        .unwrap()
        .world_transform();
    assert_relative_eq!(world.position.x, -6.0, epsilon = 1e-4);
    assert_relative_eq!(world.position.y, -5.0, epsilon = 1e-4);
    assert_relative_eq!(world.position.z, 1.0, epsilon = 1e-4);
    assert_relative_eq!(world.scale.x, 400.0, epsilon = 1e-2);
    assert_relative_eq!(world.scale.y, 400.0, epsilon = 1e-2);
    assert_relative_eq!(world.scale.z, 400.0, epsilon = 1e-2);
    let expected = Quaternion::from_angle_y(Rad(std::f32::consts::PI * 0.2));
    assert_relative_eq!(world.rotation.dot(expected).abs(), 1.0, epsilon = 1e-5);
}

#[test]
fn attached_model_is_placed_and_stamped() {
    let mut config = SceneConfig::default();
    config.model.position = [-6.0, -5.0, 1.0];
    config.model.scale = [400.0, 400.0, 400.0];
    config.model.rotation_y = 0.5;
    let mut gallery = GalleryScene::new(&config, 1.0);
    let tuning = Tuning {
        env_map_intensity: 2.5,
        ..Default::default()
    };
    let model = block_on(model_from_gltf_bytes(
        "assets",
        "triangle.glb",
        &triangle_glb(GlbOptions::default()),
    ))
    .unwrap();

    let root = gallery.attach_model(model, &tuning);

    assert_eq!(gallery.model(), Some(root));
    let graph = &gallery.scene.graph;
    let triangle = graph.get(graph.find_by_name("triangle").unwrap()).unwrap();
    assert_eq!(triangle.parent(), Some(root));
    let world = triangle.world_transform();
    assert_relative_eq!(world.position.x, -6.0, epsilon = 1e-4);
    assert_relative_eq!(world.position.y, -5.0, epsilon = 1e-4);
    assert_relative_eq!(world.position.z, 1.0, epsilon = 1e-4);
    assert_relative_eq!(world.scale.x, 400.0, epsilon = 1e-2);
    let expected = Quaternion::from_angle_y(Rad(0.5f32));
    assert_relative_eq!(world.rotation.dot(expected).abs(), 1.0, epsilon = 1e-5);

    // the material pass runs over the whole graph, not just the model
    let knot = graph.get(gallery.torus_knot().unwrap()).unwrap();
    assert_eq!(knot.mesh.as_ref().unwrap().material.env_map_intensity, 2.5);
    assert_eq!(
        triangle.mesh.as_ref().unwrap().material.env_map_intensity,
        2.5
    );
    let donut = graph.get(gallery.holy_donut().unwrap()).unwrap();
    assert_eq!(donut.mesh.as_ref().unwrap().material.env_map_intensity, 1.0);
}

#[test]
fn model_is_drawn_but_not_reflected() {
    let mut gallery = GalleryScene::new(&SceneConfig::default(), 1.0);
    let tuning = Tuning::default();
    let model = block_on(model_from_gltf_bytes(
        "assets",
        "triangle.glb",
        &triangle_glb(GlbOptions::default()),
    ))
    .unwrap();
    gallery.attach_model(model, &tuning);
    let mut renderer = RecordingRenderer::new();

    gallery.frame(&mut renderer, &tuning, 0.0).unwrap();

    match (&renderer.calls[0], &renderer.calls[1]) {
        (Call::Capture { drawn: captured, .. }, Call::Draw { drawn, .. }) => {
            assert_eq!(captured, &["holy donut"]);
            assert_eq!(drawn, &["holy donut", "torus knot", "triangle"]);
        }
        calls => panic!("unexpected calls {calls:?}"),
    }
}

#[test]
fn missing_files_fail_with_their_path() {
    let err = block_on(reflect_ngin::resources::load_model_gltf(
        "does-not-exist",
        "gallery.glb",
    ))
    .unwrap_err();
    assert!(format!("{err:#}").contains("gallery.glb"));
}
