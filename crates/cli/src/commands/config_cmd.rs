//! `volition config`: configuration management commands.

use std::path::Path;

pub async fn validate(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    let config = match super::load_config(path) {
        Ok(config) => config,
        Err(e) => {
            println!("   ❌ {e}");
            return Err(e);
        }
    };
    println!("   ✅ Config parsed successfully");

    let mut warnings = Vec::new();
    if !config.has_api_key() && config.generator.provider != "disabled" {
        warnings.push("No API key set: proposals and judgments will use deterministic fallbacks".to_string());
    }
    if config.gate.confidence_threshold > 1.5 {
        warnings.push(format!(
            "gate.confidence_threshold {} is high: most ticks will idle until stagnation forces an action",
            config.gate.confidence_threshold
        ));
    }
    if config.bandit.epsilon == 0.0 && config.gate.noise_std == 0.0 {
        warnings.push("No exploration: bandit.epsilon and gate.noise_std are both 0".to_string());
    }
    if !config.telemetry.enabled {
        warnings.push("Decision events are not being recorded (telemetry.enabled = false)".to_string());
    }

    if warnings.is_empty() {
        println!("   ✅ All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   ⚠️  {w}");
        }
    }

    println!();
    println!("   Generator:  {} ({})", config.generator.provider, config.generator.model);
    println!("   Storage:    {} at {}", config.storage.backend, config.state_dir().display());
    println!("   Threshold:  {}", config.gate.confidence_threshold);
    println!("   Goals:      {}", config.goals.len());
    println!("   Overrides:  {}", config.catalog.actions.len());

    Ok(())
}

pub async fn show(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(path)?;
    if config.generator.api_key.is_some() {
        config.generator.api_key = Some("********".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", super::config_file(path).display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    #[test]
    fn explicit_config_path_wins() {
        let path = super::super::config_file(Some(Path::new("/tmp/volition.toml")));
        assert_eq!(path, Path::new("/tmp/volition.toml"));
    }

    #[test]
    fn default_config_path_is_under_config_dir() {
        let path = super::super::config_file(None);
        assert!(path.to_str().unwrap().contains("config.toml"));
        assert!(path.starts_with(volition_config::AppConfig::config_dir()));
    }
}
