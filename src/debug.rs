//! Debug panel over the [`Tuning`] values.
//!
//! [`DebugPanel`] draws one egui slider per binding. [`DebugUi`] owns the egui
//! context and its winit input state and turns a frame of widgets into a
//! [`UiFrame`] the renderer paints over the scene.

use std::ops::BitOrAssign;

use winit::{event::WindowEvent, window::Window};

use crate::config::Tuning;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TuningField {
    BackgroundBlurriness,
    BackgroundIntensity,
    EnvMapIntensity,
}

impl TuningField {
    fn get(self, tuning: &Tuning) -> f32 {
        match self {
            TuningField::BackgroundBlurriness => tuning.background_blurriness,
            TuningField::BackgroundIntensity => tuning.background_intensity,
            TuningField::EnvMapIntensity => tuning.env_map_intensity,
        }
    }

    fn slot(self, tuning: &mut Tuning) -> &mut f32 {
        match self {
            TuningField::BackgroundBlurriness => &mut tuning.background_blurriness,
            TuningField::BackgroundIntensity => &mut tuning.background_intensity,
            TuningField::EnvMapIntensity => &mut tuning.env_map_intensity,
        }
    }
}

/// A numeric slider bound to one tuning field.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub field: TuningField,
    pub label: &'static str,
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl Binding {
    /// Clamps to `[min, max]` and snaps to the nearest step above `min`.
    ///
    /// The grid is computed in `f64` so values on it come back unchanged.
    pub fn constrain(&self, value: f32) -> f32 {
        let value = value.clamp(self.min, self.max);
        if self.step <= 0.0 {
            return value;
        }
        let (min, step) = (f64::from(self.min), f64::from(self.step));
        let steps = ((f64::from(value) - min) / step).round();
        ((min + steps * step) as f32).clamp(self.min, self.max)
    }
}

/// Result of a panel interaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PanelChange {
    pub changed: bool,
    /// The environment intensity changed and materials have to be updated.
    pub needs_material_update: bool,
}

impl BitOrAssign for PanelChange {
    fn bitor_assign(&mut self, rhs: Self) {
        self.changed |= rhs.changed;
        self.needs_material_update |= rhs.needs_material_update;
    }
}

#[derive(Clone, Debug)]
pub struct DebugPanel {
    bindings: Vec<Binding>,
    initial: Tuning,
}

impl DebugPanel {
    pub fn new(initial: Tuning) -> Self {
        let binding = |field, label| Binding {
            field,
            label,
            min: 0.0,
            max: 10.0,
            step: 0.001,
        };
        Self {
            bindings: vec![
                binding(TuningField::BackgroundBlurriness, "backgroundBlurriness"),
                binding(TuningField::BackgroundIntensity, "backgroundIntensity"),
                binding(TuningField::EnvMapIntensity, "envMapIntensity"),
            ],
            initial,
        }
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Writes `value` (clamped and snapped) into `field`.
    pub fn set(&self, tuning: &mut Tuning, field: TuningField, value: f32) -> PanelChange {
        let Some(binding) = self.bindings.iter().find(|b| b.field == field) else {
            return PanelChange::default();
        };
        let value = binding.constrain(value);
        let slot = field.slot(tuning);
        if *slot == value {
            return PanelChange::default();
        }
        *slot = value;
        log::debug!("{} = {}", binding.label, value);
        PanelChange {
            changed: true,
            needs_material_update: field == TuningField::EnvMapIntensity,
        }
    }

    /// Restores every binding to the value the panel was created with.
    pub fn reset(&self, tuning: &mut Tuning) -> PanelChange {
        let mut change = PanelChange::default();
        for binding in &self.bindings {
            change |= self.set(tuning, binding.field, binding.field.get(&self.initial));
        }
        change
    }

    /// Draws the panel window and applies whatever the sliders changed.
    pub fn show(&self, ctx: &egui::Context, tuning: &mut Tuning) -> PanelChange {
        let mut change = PanelChange::default();
        egui::Window::new("Debug")
            .resizable(false)
            .default_pos([16.0, 16.0])
            .show(ctx, |ui| {
                for binding in &self.bindings {
                    let mut value = binding.field.get(tuning);
                    let slider = egui::Slider::new(&mut value, binding.min..=binding.max)
                        .step_by(f64::from(binding.step))
                        .max_decimals(3)
                        .text(binding.label);
                    if ui.add(slider).changed() {
                        change |= self.set(tuning, binding.field, value);
                    }
                }
                if ui.button("Reset").clicked() {
                    change |= self.reset(tuning);
                }
            });
        change
    }
}

impl Default for DebugPanel {
    fn default() -> Self {
        Self::new(Tuning::default())
    }
}

/// Tessellated widgets of one frame, ready to be painted.
pub struct UiFrame {
    pub paint_jobs: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

/// egui context plus the winit input state feeding it.
pub struct DebugUi {
    ctx: egui::Context,
    state: egui_winit::State,
}

impl DebugUi {
    pub fn new(window: &Window) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        Self { ctx, state }
    }

    /// Returns whether egui consumed the event; consumed events do not reach the camera.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Runs `build` over the frame's input and tessellates the result.
    pub fn run(&mut self, window: &Window, mut build: impl FnMut(&egui::Context)) -> UiFrame {
        let raw_input = self.state.take_egui_input(window);
        let full_output = self.ctx.run_ui(raw_input, |ui| build(ui.ctx()));
        self.state.handle_platform_output(window, full_output.platform_output);
        let paint_jobs = self.ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
        UiFrame {
            paint_jobs,
            textures_delta: full_output.textures_delta,
            pixels_per_point: full_output.pixels_per_point,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapping_stays_inside_the_range() {
        let panel = DebugPanel::default();
        let binding = &panel.bindings()[0];
        assert_eq!(binding.constrain(-1.0), 0.0);
        assert_eq!(binding.constrain(12.0), 10.0);
        assert!((binding.constrain(0.12345) - 0.123).abs() < 1e-5);
    }

    #[test]
    fn values_on_the_grid_are_kept_exactly() {
        let panel = DebugPanel::default();
        let binding = &panel.bindings()[2];
        assert_eq!(binding.constrain(3.0), 3.0);
        assert_eq!(binding.constrain(7.5), 7.5);
        assert_eq!(binding.constrain(9.999), 9.999);
    }

    #[test]
    fn changes_merge() {
        let mut change = PanelChange::default();
        change |= PanelChange {
            changed: true,
            needs_material_update: false,
        };
        change |= PanelChange {
            changed: true,
            needs_material_update: true,
        };
        change |= PanelChange::default();
        assert!(change.changed && change.needs_material_update);
    }
}
