use reflect_ngin::{config::SceneConfig, scene::GalleryScene, viewport::Viewport};

#[test]
fn repository_scene_file_matches_the_defaults() {
    let config = SceneConfig::load(concat!(env!("CARGO_MANIFEST_DIR"), "/scene.toml")).unwrap();
    let defaults = SceneConfig::default();
    assert_eq!(config.assets, defaults.assets);
    assert_eq!(config.tuning, defaults.tuning);
    assert_eq!(config.camera, defaults.camera);
    assert_eq!(config.viewport, defaults.viewport);
    assert_eq!(config.reflection, defaults.reflection);
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let path = std::env::temp_dir().join("reflect-ngin-no-such-scene.toml");
    let config = SceneConfig::load_or_default(&path).unwrap();
    assert_eq!(config, SceneConfig::default());
}

#[test]
fn broken_file_names_its_path() {
    let path = std::env::temp_dir().join("reflect-ngin-broken-scene.toml");
    std::fs::write(&path, "[reflection]\nresolution = 0\n").unwrap();
    let err = SceneConfig::load(&path).unwrap_err();
    std::fs::remove_file(&path).unwrap();
    let message = format!("{err:#}");
    assert!(message.contains("reflection.resolution"));
    assert!(message.contains("reflect-ngin-broken-scene.toml"));
}

#[test]
fn configured_cameras_reach_the_gallery() {
    let config = SceneConfig::from_toml_str(
        r#"
        [camera]
        fov = 50.0
        position = [1.0, 2.0, 3.0]

        [reflection]
        resolution = 128
        position = [0.0, 1.0, 0.0]

        [viewport]
        width = 640
        height = 480
        "#,
    )
    .unwrap();
    let viewport = Viewport::new(&config.viewport);
    let gallery = GalleryScene::new(&config, viewport.aspect());

    assert_eq!(gallery.cube_camera.target().resolution, 128);
    assert_eq!(gallery.cube_camera.position, cgmath::Point3::new(0.0, 1.0, 0.0));
    assert_eq!(gallery.camera.aspect, 640.0 / 480.0);
}
