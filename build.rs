use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::PathBuf;

/// Ships the asset directory and the default scene file next to the build output.
fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets/*");
    println!("cargo:rerun-if-changed=scene.toml");

    let out_dir = env::var("OUT_DIR")?;
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let mut copy_options = CopyOptions::new();
    copy_options.overwrite = true;

    let shipped: Vec<PathBuf> = ["assets", "scene.toml"]
        .iter()
        .map(|entry| manifest_dir.join(entry))
        .filter(|path| path.exists())
        .collect();
    if !shipped.is_empty() {
        copy_items(&shipped, out_dir, &copy_options)?;
    }

    Ok(())
}
