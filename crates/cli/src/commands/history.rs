//! `volition history`: show recent decisions.

use std::path::Path;
use volition_agent::HistoryEntry;
use volition_core::store::{self, keys};

pub async fn run(path: Option<&Path>, last: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(path)?;
    let store = super::open_store(&config);
    let entries: Vec<HistoryEntry> = store::load_tail(store.as_ref(), keys::HISTORY, last).await;

    if entries.is_empty() {
        println!("No decisions recorded yet. Run `volition run` first.");
        return Ok(());
    }

    println!("🧭 Last {} decision(s)\n", entries.len());
    for entry in &entries {
        let result = if entry.success { "✅" } else { "❌" };
        let satisfaction = entry
            .satisfaction
            .map(|s| format!("{s:.2}"))
            .unwrap_or_else(|| "-".into());
        let forced = if entry.forced { " [forced]" } else { "" };
        println!(
            "  #{:<4} {}  {result} {:<10} {:<9} satisfaction {satisfaction}{forced}",
            entry.tick,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.action,
            entry.kind.to_string(),
        );
        if let Some(rationale) = &entry.rationale {
            println!("        {rationale}");
        }
    }

    Ok(())
}
