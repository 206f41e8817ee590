//! Common types shared across the engine.
//!
//! The error type lives here so that pattern parsing, corpus construction,
//! byte-source reads and container access all report through one enum.

// Submodule declarations
pub mod error;

// Re-exports for convenience
pub use error::{Error, Result};
