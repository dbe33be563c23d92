use std::path::Path;

use anyhow::Context as _;

use crate::data_structures::texture_data::{ColorSpace, Mapping, TextureData};

#[cfg(target_arch = "wasm32")]
fn format_url(root: &str, file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("no browser window")?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("cannot read the page origin"))?;
    let base = reqwest::Url::parse(&format!("{origin}/{}/", root.trim_matches('/')))?;
    Ok(base.join(file_name)?)
}

/// Reads an asset relative to `root`: a directory on native targets, a path below the page
/// origin on the web.
pub async fn load_binary(root: &str, file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(root, file_name)?;
        reqwest::get(url.clone())
            .await
            .with_context(|| format!("cannot fetch {url}"))?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = Path::new(root).join(file_name);
        std::fs::read(&path).with_context(|| format!("cannot read {}", path.display()))?
    };

    Ok(data)
}

fn is_high_dynamic_range(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("hdr") || ext.eq_ignore_ascii_case("exr"))
}

/**
 * Decodes an equirectangular panorama.
 *
 * LDR images are sRGB encoded. HDR and EXR images hold linear values, which are clamped
 * to 8 bits here.
 */
pub fn decode_environment_map(file_name: &str, bytes: &[u8]) -> anyhow::Result<TextureData> {
    let image = match image::ImageFormat::from_path(file_name) {
        Ok(format) => image::load_from_memory_with_format(bytes, format),
        Err(_) => image::load_from_memory(bytes),
    }
    .with_context(|| format!("cannot decode environment map {file_name}"))?;
    let color_space = if is_high_dynamic_range(file_name) {
        ColorSpace::Linear
    } else {
        ColorSpace::Srgb
    };
    Ok(TextureData::new(file_name, image.to_rgba8())
        .with_mapping(Mapping::EquirectangularReflection)
        .with_color_space(color_space))
}

pub async fn load_environment_map(root: &str, file_name: &str) -> anyhow::Result<TextureData> {
    let bytes = load_binary(root, file_name).await?;
    let texture = decode_environment_map(file_name, &bytes)?;
    let (width, height) = texture.dimensions();
    log::info!("Loaded environment map {file_name} ({width}x{height})");
    Ok(texture)
}
