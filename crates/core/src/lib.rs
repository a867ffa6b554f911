//! # Volition Core
//!
//! Domain types, traits, and error definitions for the Volition decision core.
//! This crate has **no framework dependencies**; it defines the domain model
//! that the store, provider, action, and agent crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator of the decision loop is a trait here:
//! - [`TextGenerator`]: the opaque text-generation service
//! - [`StateStore`]: the key-value persistence layer
//! - [`Behavior`]: one executable entry of the action catalog
//!
//! Implementations live in their respective crates, so the loop can be
//! driven by real backends in production and by scripted fakes in tests.

pub mod action;
pub mod affect;
pub mod catalog;
pub mod error;
pub mod event;
pub mod generator;
pub mod goal;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use action::{Action, ActionKind, ActionOutcome, GateState};
pub use affect::{AffectDimension, AffectState};
pub use catalog::{ActionCatalog, Behavior, CatalogEntry};
pub use error::{ActionError, AgentError, Error, GenerationError, Result, StoreError};
pub use event::{DomainEvent, EventBus};
pub use generator::{GenerationRequest, TextGenerator};
pub use goal::Goal;
pub use store::StateStore;
