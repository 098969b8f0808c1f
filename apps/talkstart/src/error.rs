//! # Application Errors
//!
//! One error type for the binary: wraps core errors and adds the failures
//! that only exist at the edges (files, configuration, sockets).

use talkstart_core::{CatalogError, ScreeningError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Screening(#[from] ScreeningError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(String),

    /// The server refuses new sessions until old ones are deleted.
    #[error("Session limit of {0} reached")]
    SessionLimit(usize),
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}
