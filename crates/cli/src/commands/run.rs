//! `volition run`: drive the decision loop for a number of ticks.

use std::path::Path;
use volition_agent::{AgentLoop, TickReport};

pub async fn run(
    path: Option<&Path>,
    ticks: u64,
    seed: Option<u64>,
    offline: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(path)?;
    if seed.is_some() {
        config.agent.seed = seed;
    }
    if offline {
        config.generator.provider = "disabled".into();
    }

    let store = super::open_store(&config);
    let mut agent = AgentLoop::from_config(config, store);

    println!("🧭 Running {ticks} tick(s)\n");
    for report in agent.run(ticks).await {
        println!("  {}", describe(&report));
    }

    let summary = agent.summary();
    println!();
    println!(
        "  {} tick(s): {} executed, {} idle, {} forced, {} escalated",
        summary.ticks, summary.executions, summary.idle_ticks, summary.forced, summary.escalations
    );
    if let Some(rate) = summary.success_rate() {
        println!("  Success rate: {:.0}%", rate * 100.0);
    }
    if let Some(reward) = summary.mean_reward {
        println!("  Mean satisfaction: {reward:.2}");
    }
    if summary.fallbacks > 0 {
        println!("  Fallbacks used: {}", summary.fallbacks);
    }

    Ok(())
}

/// One line per tick.
pub fn describe(report: &TickReport) -> String {
    let event = &report.event;
    let Some(chosen) = &event.chosen else {
        let best = event
            .top_candidate()
            .map(|c| format!(" (best: {} {:.2})", c.name, c.score))
            .unwrap_or_default();
        return format!("#{:<4} idle{best}", report.tick);
    };

    let mut line = format!("#{:<4} {:<10} {}", report.tick, chosen, event.gate_state);
    if let Some(reward) = event.reward {
        line.push_str(&format!("  satisfaction {reward:.2}"));
    }
    if event.forced {
        line.push_str("  [forced]");
    }
    if event.from_queue {
        line.push_str("  [queued]");
    }
    if report.persistence_failures > 0 {
        line.push_str(&format!("  ⚠️ {} save failure(s)", report.persistence_failures));
    }
    line
}
