//! # Glade Config
//!
//! Configuration management for the Glade cache layer.
//! Supports layered configuration from files, environment variables,
//! and runtime refresh.

mod loader;
mod settings;
mod validation;

pub use loader::*;
pub use settings::*;
pub use validation::*;
