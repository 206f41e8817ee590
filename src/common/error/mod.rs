//! Unified error types for Quince.
//!
//! This module provides a single error type covering corpus construction,
//! byte-source failures and container access.

// Submodule declarations
pub mod conversions;
pub mod types;

// Re-exports
pub use types::{Error, Result};
