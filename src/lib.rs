//! reflect-ngin
//!
//! A small wgpu gallery for environment mapping: a glTF room, an equirectangular
//! background with tunable blur and brightness, and physically-lit surfaces that
//! reflect a cube capture of the scene, refreshed every frame. Runs natively and
//! in the browser.
//!
//! High-level modules
//! - `config`: scene configuration (TOML) and the live tuning values
//! - `camera`: perspective camera, orbit controls and camera uniforms
//! - `context`: window, surface, device and queue
//! - `data_structures`: geometry, materials, textures and the scene graph
//! - `pipelines`: PBR, unlit and background render pipelines
//! - `render`: the renderer seam and draw list collection
//! - `gpu_renderer`: the wgpu implementation of the renderer seam
//! - `reflection`: the six-face cube capture rig
//! - `resources`: glTF and environment map loading
//! - `scene`: the gallery scene and its per-frame tick
//! - `viewport`: window size and pixel ratio handling
//! - `debug`: keyboard-driven tuning panel
//! - `flow`: the winit event loop tying it all together
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod debug;
pub mod flow;
pub mod gpu_renderer;
pub mod pipelines;
pub mod reflection;
pub mod render;
pub mod resources;
pub mod scene;
pub mod viewport;

// Re-exports commonly used types for convenience in downstream code.
pub use config::{SceneConfig, Tuning};
pub use render::SceneRenderer;
pub use scene::{GalleryScene, Scene};
