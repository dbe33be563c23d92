//! Engine data structures: geometry, materials, textures, and the scene graph.
//!
//! - `model` holds vertex layouts and CPU-side geometry
//! - `geometry` builds the procedural torus shapes
//! - `material` describes surfaces and the material pass over a graph
//! - `texture_data` holds decoded images before upload
//! - `texture` wraps GPU textures, including the reflection cube
//! - `instance` holds per-node transforms and their GPU layout
//! - `scene_graph` enables hierarchical scene organization

pub mod geometry;
pub mod instance;
pub mod material;
pub mod model;
pub mod scene_graph;
pub mod texture;
pub mod texture_data;
