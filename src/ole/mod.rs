//! OLE2 compound document reading.
//!
//! Enough of the Compound File Binary format to enumerate and read streams,
//! used by the container walker.

/// Constants for OLE file format
pub mod consts;

/// OLE file parsing implementation
mod file;

pub use file::{OleError, OleFile};
