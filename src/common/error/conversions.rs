//! Error conversion implementations.
//!
//! This module contains From trait implementations to convert from the
//! container readers' error types to the unified Error type.

use super::types::Error;
use crate::ole::OleError;

impl From<OleError> for Error {
    fn from(err: OleError) -> Self {
        match err {
            OleError::Io(e) => Error::Io(e),
            other => Error::Container(other.to_string()),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            other => Error::Container(other.to_string()),
        }
    }
}
