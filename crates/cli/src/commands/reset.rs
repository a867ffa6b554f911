//! `volition reset`: delete persisted state.

use std::path::Path;
use volition_agent::AgentLoop;
use volition_core::store::keys;

pub async fn run(path: Option<&Path>, artifact: &str, action: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(path)?;
    let store = super::open_store(&config);
    let mut agent = AgentLoop::from_config(config, store);

    if let Some(action) = action {
        if artifact != keys::BANDIT {
            return Err(format!("--action only applies to the '{}' artifact", keys::BANDIT).into());
        }
        let cleared = agent.reset_bandit(Some(action)).await?;
        if cleared == 0 {
            println!("  No learned arm for '{action}'");
        } else {
            println!("  ✅ Forgot what was learned about '{action}'");
        }
        return Ok(());
    }

    let targets: Vec<&str> = if artifact == "all" {
        keys::DOCUMENTS.iter().chain(keys::LISTS.iter()).copied().collect()
    } else {
        vec![artifact]
    };

    for key in targets {
        match agent.reset_artifact(key).await {
            Ok(true) => println!("  ✅ Reset {key}"),
            Ok(false) => println!("  ·  {key} was already empty"),
            Err(e) => {
                let known: Vec<&str> = keys::DOCUMENTS.iter().chain(keys::LISTS.iter()).copied().collect();
                return Err(format!("{e} (known artifacts: all, {})", known.join(", ")).into());
            }
        }
    }

    Ok(())
}
