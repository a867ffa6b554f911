//! State store implementations for Volition.

pub mod file_backend;
pub mod in_memory;

pub use file_backend::FileStore;
pub use in_memory::MemoryStore;
