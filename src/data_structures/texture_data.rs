//! Decoded images waiting to be uploaded to the GPU.

use std::sync::atomic::{AtomicU64, Ordering};

/// How a texture is projected when sampled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mapping {
    /// Regular mesh texture addressed by vertex UVs.
    #[default]
    Uv,
    /// Latitude/longitude panorama addressed by a world-space direction.
    EquirectangularReflection,
}

/// Colour space the stored bytes are encoded in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorSpace {
    #[default]
    Srgb,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// An RGBA8 image plus the metadata needed to create its GPU texture.
#[derive(Clone, Debug)]
pub struct TextureData {
    id: TextureId,
    pub label: String,
    pub image: image::RgbaImage,
    pub mapping: Mapping,
    pub color_space: ColorSpace,
}

/// Two textures are equal when they are the same upload, not when their pixels match.
impl PartialEq for TextureData {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl TextureData {
    pub fn new(label: impl Into<String>, image: image::RgbaImage) -> Self {
        Self {
            id: TextureId::next(),
            label: label.into(),
            image,
            mapping: Mapping::default(),
            color_space: ColorSpace::default(),
        }
    }

    pub fn with_mapping(mut self, mapping: Mapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Number of mip levels a full chain down to 1x1 needs.
    pub fn mip_level_count(&self) -> u32 {
        let (width, height) = self.dimensions();
        32 - width.max(height).max(1).leading_zeros()
    }

    /// Full mip chain, level 0 first, each level half the size of the previous.
    pub fn mip_chain(&self) -> Vec<image::RgbaImage> {
        let mut levels = vec![self.image.clone()];
        for _ in 1..self.mip_level_count() {
            let Some(prev) = levels.last() else { break };
            let width = (prev.width() / 2).max(1);
            let height = (prev.height() / 2).max(1);
            levels.push(image::imageops::resize(
                prev,
                width,
                height,
                image::imageops::FilterType::Triangle,
            ));
        }
        levels
    }
}
