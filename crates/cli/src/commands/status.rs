//! `volition status`: show loop state.

use std::path::Path;
use volition_agent::AgentLoop;
use volition_core::affect::AffectDimension;

pub async fn run(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(path)?;
    let gate = config.gate.clone();
    let backend = config.storage.backend.clone();
    let state_dir = config.state_dir();
    let generator = if config.has_api_key() {
        format!("{} ({})", config.generator.provider, config.generator.model)
    } else {
        "offline".to_string()
    };

    let store = super::open_store(&config);
    let mut agent = AgentLoop::from_config(config, store);
    let actions = agent.catalog().len();
    let state = agent.current_state().await;

    println!("🧭 Volition Status");
    println!("==================");
    println!("  State:        {} ({})", state_dir.display(), backend);
    println!("  Generator:    {generator}");
    println!("  Actions:      {actions}");
    println!("  Tick:         {}", state.meta.tick);
    match &state.meta.last_action {
        Some(last) => println!("  Last action:  {last} (x{})", state.meta.repeat_streak),
        None => println!("  Last action:  none"),
    }
    println!(
        "  Agentic gap:  {} tick(s), threshold {:.1}",
        state.overlay.cycles_since_agentic,
        state.overlay.dynamic_threshold(&gate)
    );
    println!("  Frustration:  {:.2}", state.overlay.frustration());

    println!("\n  Affect");
    for dim in AffectDimension::ALL {
        println!("    {:<12} {:.2}", dim.as_str(), state.affect.get(dim));
    }

    println!("\n  Pending ({})", state.pending.len());
    for action in state.pending.iter() {
        println!("    {} (urgency {:.2}, retries {})", action.name, action.urgency, action.retries);
    }

    if !state.goals.is_empty() {
        println!("\n  Goals");
        for goal in &state.goals {
            let mark = if goal.completed { "✅" } else { "  " };
            println!("    {mark} [{}] {} (tier {})", goal.id, goal.description, goal.tier);
        }
    }

    if !state.bandit.is_empty() {
        println!("\n  Learned arms");
        for (name, arm) in state.bandit.arms() {
            println!("    {:<10} {} use(s)", name, arm.uses);
        }
    }

    Ok(())
}
