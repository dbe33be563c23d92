//! Scene configuration and live tuning values.
//!
//! [`SceneConfig`] describes everything that is fixed when the scene starts:
//! which assets to load, where the model goes, how the camera, controls and
//! reflection rig are set up. [`Tuning`] holds the few values that stay
//! mutable at runtime through the debug panel. Every section falls back to
//! its default when it is missing from the TOML file, so an empty file is a
//! valid configuration.

use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// Lighting parameters tweakable while the scene runs.
///
/// Owned by the application state and passed by reference into the material
/// pass and the render loop.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Blur of the background only, `0` keeps it sharp.
    pub background_blurriness: f32,
    /// Brightness of the background only, lighting is unaffected.
    pub background_intensity: f32,
    /// Environment intensity stamped onto every physically-lit material.
    pub env_map_intensity: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            background_blurriness: 0.0,
            background_intensity: 1.0,
            env_map_intensity: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory (native) or URL prefix (web) all asset paths are relative to.
    pub root: String,
    pub model: Option<String>,
    pub environment_map: Option<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: "assets".to_string(),
            model: Some("models/gallery-new.glb".to_string()),
            environment_map: Some(
                "environmentMaps/blockadesLabsSkybox/interior_views_cozy_wood_cabin_with_cauldron_and_p.jpg"
                    .to_string(),
            ),
        }
    }
}

/// Where the loaded model is placed once it arrives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPlacement {
    pub scale: [f32; 3],
    pub position: [f32; 3],
    /// Rotation about the vertical axis in radians.
    pub rotation_y: f32,
}

impl Default for ModelPlacement {
    fn default() -> Self {
        Self {
            scale: [400.0, 400.0, 400.0],
            position: [-6.0, -5.0, 1.0],
            rotation_y: std::f32::consts::PI * 0.2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 100.0,
            position: [4.0, 5.0, 4.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub target: [f32; 3],
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            target: [0.0, 3.5, 0.0],
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectionConfig {
    /// Edge length in pixels of each of the six capture faces.
    pub resolution: u32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            resolution: 256,
            near: 0.1,
            far: 100.0,
            position: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Initial logical window size.
    pub width: u32,
    pub height: u32,
    pub max_pixel_ratio: f32,
    pub title: String,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            max_pixel_ratio: 2.0,
            title: "reflect-ngin".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub assets: AssetConfig,
    pub model: ModelPlacement,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub reflection: ReflectionConfig,
    pub tuning: Tuning,
    pub viewport: ViewportConfig,
}

impl SceneConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: SceneConfig = toml::from_str(text).context("invalid scene configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read scene configuration {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Loads `path` if it exists and falls back to the defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            log::info!(
                "No scene configuration at {}, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.reflection.resolution > 0,
            "reflection.resolution must be positive"
        );
        anyhow::ensure!(
            self.camera.near > 0.0 && self.camera.far > self.camera.near,
            "camera.near must be positive and smaller than camera.far"
        );
        anyhow::ensure!(
            self.reflection.near > 0.0 && self.reflection.far > self.reflection.near,
            "reflection.near must be positive and smaller than reflection.far"
        );
        anyhow::ensure!(
            self.viewport.max_pixel_ratio >= 1.0,
            "viewport.max_pixel_ratio must be at least 1"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_the_default_scene() {
        let config = SceneConfig::from_toml_str("").unwrap();
        assert_eq!(config, SceneConfig::default());
        assert_eq!(config.reflection.resolution, 256);
        assert_eq!(config.tuning.env_map_intensity, 1.0);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = SceneConfig::from_toml_str(
            r#"
            [tuning]
            env_map_intensity = 2.5

            [camera]
            fov = 60.0
            "#,
        )
        .unwrap();
        assert_eq!(config.tuning.env_map_intensity, 2.5);
        assert_eq!(config.tuning.background_intensity, 1.0);
        assert_eq!(config.camera.fov, 60.0);
        assert_eq!(config.camera.position, [4.0, 5.0, 4.0]);
        assert_eq!(config.model, ModelPlacement::default());
    }

    #[test]
    fn rejects_inverted_clip_planes() {
        let err = SceneConfig::from_toml_str(
            r#"
            [camera]
            near = 10.0
            far = 1.0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("camera.near"));
    }

    #[test]
    fn asset_root_can_be_moved() {
        let config = SceneConfig::from_toml_str(
            r#"
            [assets]
            root = "static"
            "#,
        )
        .unwrap();
        assert_eq!(config.assets.root, "static");
        // Options keep their defaults unless explicitly overridden.
        assert!(config.assets.model.is_some());
    }
}
