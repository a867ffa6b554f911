//! Text generator backends for Volition.
//!
//! All backends implement the `volition_core::TextGenerator` trait.
//! [`build_from_config`] assembles the generator the loop talks to.

pub mod disabled;
pub mod fallback;
pub mod openai_compat;
pub mod router;

pub use disabled::DisabledGenerator;
pub use fallback::FallbackGenerator;
pub use openai_compat::OpenAiCompatGenerator;
pub use router::{GeneratorRouter, build_from_config};
