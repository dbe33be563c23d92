use reflect_ngin::{config::SceneConfig, flow};

const DEFAULT_CONFIG: &str = "scene.toml";

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = SceneConfig::load_or_default(&path)?;
    flow::run(config)
}
