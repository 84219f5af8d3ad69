//! # Glade Core
//!
//! Core types shared by the Glade cache crates: the error taxonomy, result
//! aliases, eviction strategies and tracing setup.

pub mod error;
pub mod result;
pub mod strategy;
pub mod telemetry;

pub use error::*;
pub use result::*;
pub use strategy::*;
pub use telemetry::*;

// Re-export shaku for dependency injection
pub use shaku::Interface;
