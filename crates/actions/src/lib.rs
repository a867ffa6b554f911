//! Built-in behaviors and catalog construction for Volition.
//!
//! The catalog is static: the built-in behaviors below, adjusted by the
//! `[catalog]` section of the config (rename summaries, flip flags, disable
//! entries). `reload_catalog` rebuilds it in place when the config changes.

pub mod agentic;
pub mod cognitive;
pub mod journal;

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use volition_config::CatalogConfig;
use volition_core::catalog::{ActionCatalog, Behavior, CatalogEntry};
use volition_core::generator::TextGenerator;
use volition_core::store::StateStore;

pub use journal::{ClarificationRequest, JournalEntry};

/// Every built-in behavior.
pub fn builtin_behaviors(
    store: Arc<dyn StateStore>,
    generator: Option<Arc<dyn TextGenerator>>,
) -> Vec<Arc<dyn Behavior>> {
    let mut reflect = cognitive::ReflectBehavior::new(store.clone());
    let mut dream = cognitive::DreamBehavior::new(store.clone());
    if let Some(generator) = generator {
        reflect = reflect.with_generator(generator.clone());
        dream = dream.with_generator(generator);
    }

    vec![
        Arc::new(reflect),
        Arc::new(cognitive::PlanBehavior::new(store.clone())),
        Arc::new(cognitive::LogBehavior::new(store.clone())),
        Arc::new(dream),
        Arc::new(agentic::SpeakBehavior::new(store.clone())),
        Arc::new(agentic::ExploreBehavior::new(store.clone())),
        Arc::new(agentic::AskUserBehavior::new(store)),
    ]
}

/// Apply config overrides to a set of behaviors.
///
/// Overrides naming no known behavior are ignored with a warning.
pub fn catalog_entries(behaviors: Vec<Arc<dyn Behavior>>, config: &CatalogConfig) -> Vec<CatalogEntry> {
    let known: HashSet<String> = behaviors.iter().map(|b| b.name().to_string()).collect();
    for over in &config.actions {
        if !known.contains(&over.name) {
            warn!(action = %over.name, "Catalog override names no known behavior, ignoring");
        }
    }

    behaviors
        .into_iter()
        .filter_map(|behavior| {
            let mut entry = CatalogEntry::new(behavior);
            let Some(over) = config
                .actions
                .iter()
                .find(|a| a.name == entry.behavior.name())
            else {
                return Some(entry);
            };
            if !over.enabled {
                debug!(action = %over.name, "Action disabled by config");
                return None;
            }
            if let Some(summary) = &over.summary {
                entry.summary = summary.clone();
            }
            if let Some(agentic) = over.agentic {
                entry.agentic = agentic;
            }
            if let Some(user_facing) = over.user_facing {
                entry.user_facing = user_facing;
            }
            Some(entry)
        })
        .collect()
}

/// Build the catalog from the built-ins and the config overrides.
pub fn build_catalog(
    config: &CatalogConfig,
    store: Arc<dyn StateStore>,
    generator: Option<Arc<dyn TextGenerator>>,
) -> ActionCatalog {
    let mut catalog = ActionCatalog::new();
    reload_catalog(&mut catalog, config, store, generator);
    catalog
}

/// Replace the catalog's contents after a config change.
pub fn reload_catalog(
    catalog: &mut ActionCatalog,
    config: &CatalogConfig,
    store: Arc<dyn StateStore>,
    generator: Option<Arc<dyn TextGenerator>>,
) {
    catalog.reload(catalog_entries(builtin_behaviors(store, generator), config));
    debug!(actions = catalog.len(), "Action catalog loaded");
}
