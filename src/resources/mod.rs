//! Asynchronous asset loading.
//!
//! Loaders only produce CPU-side data ([`LoadedModel`], [`TextureData`]); the
//! GPU renderer uploads it the first time it is drawn. On native targets
//! assets are read from a directory, on the web they are fetched relative to
//! the page origin.
//!
//! [`TextureData`]: crate::data_structures::texture_data::TextureData

pub mod mesh;
pub mod texture;

pub use mesh::{load_model_gltf, model_from_gltf_bytes, LoadedModel};
pub use texture::{decode_environment_map, load_binary, load_environment_map};
