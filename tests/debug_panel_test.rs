use approx::assert_relative_eq;
use reflect_ngin::{
    config::{SceneConfig, Tuning},
    data_structures::material::update_all_materials,
    debug::{DebugPanel, PanelChange, TuningField},
    scene::GalleryScene,
};

#[test]
fn panel_exposes_the_three_tuning_values() {
    let panel = DebugPanel::default();
    let labels: Vec<_> = panel.bindings().iter().map(|b| b.label).collect();
    assert_eq!(
        labels,
        vec!["backgroundBlurriness", "backgroundIntensity", "envMapIntensity"]
    );
    for binding in panel.bindings() {
        assert_eq!((binding.min, binding.max, binding.step), (0.0, 10.0, 0.001));
    }
}

#[test]
fn background_changes_do_not_touch_materials() {
    let panel = DebugPanel::default();
    let mut tuning = Tuning::default();

    let change = panel.set(&mut tuning, TuningField::BackgroundBlurriness, 0.4);

    assert_eq!(
        change,
        PanelChange {
            changed: true,
            needs_material_update: false
        }
    );
    assert_relative_eq!(tuning.background_blurriness, 0.4, epsilon = 1e-6);
}

#[test]
fn out_of_range_values_are_clamped() {
    let panel = DebugPanel::default();
    let mut tuning = Tuning::default();

    panel.set(&mut tuning, TuningField::BackgroundIntensity, 42.0);
    assert_eq!(tuning.background_intensity, 10.0);
    panel.set(&mut tuning, TuningField::BackgroundIntensity, -3.0);
    assert_eq!(tuning.background_intensity, 0.0);
}

#[test]
fn setting_the_same_value_reports_no_change() {
    let panel = DebugPanel::default();
    let mut tuning = Tuning::default();
    let change = panel.set(&mut tuning, TuningField::EnvMapIntensity, 1.0);
    assert_eq!(change, PanelChange::default());
}

#[test]
fn reset_restores_the_initial_values() {
    let initial = Tuning {
        env_map_intensity: 2.0,
        ..Tuning::default()
    };
    let panel = DebugPanel::new(initial);
    let mut tuning = initial;

    panel.set(&mut tuning, TuningField::BackgroundIntensity, 4.0);
    panel.set(&mut tuning, TuningField::EnvMapIntensity, 0.5);
    let change = panel.reset(&mut tuning);

    assert!(change.changed && change.needs_material_update);
    assert_eq!(tuning, initial);
    assert_eq!(panel.reset(&mut tuning), PanelChange::default());
}

#[test]
fn a_frame_without_input_changes_nothing() {
    let panel = DebugPanel::default();
    let mut tuning = Tuning::default();
    let ctx = egui::Context::default();

    let mut change = PanelChange::default();
    for _ in 0..2 {
        let _ = ctx.run_ui(egui::RawInput::default(), |ui| {
            change |= panel.show(ui.ctx(), &mut tuning);
        });
    }

    assert_eq!(change, PanelChange::default());
    assert_eq!(tuning, Tuning::default());
}

#[test]
fn intensity_changes_reach_every_lit_material() {
    let mut gallery = GalleryScene::new(&SceneConfig::default(), 1.0);
    let panel = DebugPanel::default();
    let mut tuning = Tuning::default();

    let change = panel.set(&mut tuning, TuningField::EnvMapIntensity, 3.0);
    if change.needs_material_update {
        update_all_materials(&mut gallery.scene.graph, &tuning);
    }

    let graph = &gallery.scene.graph;
    let knot = graph.get(gallery.torus_knot().unwrap()).unwrap();
    assert_eq!(knot.mesh.as_ref().unwrap().material.env_map_intensity, 3.0);

    // a second pass with the same tuning is a no-op
    let before = knot.mesh.clone().map(|mesh| mesh.material);
    update_all_materials(&mut gallery.scene.graph, &tuning);
    let graph = &gallery.scene.graph;
    let after = graph
        .get(gallery.torus_knot().unwrap())
        .unwrap()
        .mesh
        .clone()
        .map(|mesh| mesh.material);
    assert_eq!(before, after);
}
