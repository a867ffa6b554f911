//! `volition catalog`: list the available actions.

use std::path::Path;
use volition_agent::AgentLoop;

pub async fn run(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(path)?;
    let store = super::open_store(&config);
    let mut agent = AgentLoop::from_config(config, store);

    let rows: Vec<(String, String, bool, String)> = agent
        .catalog()
        .list_candidates()
        .into_iter()
        .map(|name| {
            let catalog = agent.catalog();
            let kind = catalog.kind_of(&name).to_string();
            let user_facing = catalog.is_user_facing(&name);
            let summary = catalog.summary(&name).unwrap_or_default().to_string();
            (name, kind, user_facing, summary)
        })
        .collect();
    let state = agent.current_state().await;

    println!("🧭 Action catalog ({})\n", rows.len());
    for (name, kind, user_facing, summary) in rows {
        let facing = if user_facing { "user-facing" } else { "" };
        println!(
            "  {:<10} {:<9} {:<11} {:>4} use(s)  {summary}",
            name,
            kind,
            facing,
            state.bandit.uses(&name)
        );
    }

    Ok(())
}
