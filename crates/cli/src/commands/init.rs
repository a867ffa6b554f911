//! `volition init`: write a default config and create the state directory.

use std::path::Path;
use volition_config::AppConfig;

pub async fn run(path: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = super::config_file(path);

    println!("🧭 Volition Setup");
    println!("=================\n");

    if config_path.exists() && !force {
        println!("  ⚠️  Config already exists at {}", config_path.display());
        println!("     Pass --force to overwrite it");
    } else {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  ✅ Wrote {}", config_path.display());
    }

    let config = super::load_config(Some(&config_path))?;
    let state_dir = config.state_dir();
    std::fs::create_dir_all(&state_dir)?;
    println!("  ✅ State directory {}", state_dir.display());

    println!();
    if config.has_api_key() {
        println!("  Generator: {} ({})", config.generator.provider, config.generator.model);
    } else {
        println!("  No API key set: the loop will run on deterministic fallbacks.");
        println!("  Set VOLITION_API_KEY or generator.api_key to enable the generator.");
    }
    println!("  Next: volition run --ticks 5");

    Ok(())
}
