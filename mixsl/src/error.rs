//! Error types for mixsl operations

use thiserror::Error;

/// Error type for mixsl operations
///
/// In-language problems (unresolved names, bad compositions, packing
/// issues) are reported through [`crate::Diagnostics`], not through this
/// type; `Error` covers failures of the surrounding machinery.
#[derive(Error, Debug)]
pub enum Error {
    /// No source registered under the requested class name
    #[error("shader class not found: {0}")]
    ClassNotFound(String),

    /// A class document could not be parsed
    #[error("failed to parse class {class}: {message}")]
    Parse {
        /// The class being parsed
        class: String,
        /// What went wrong
        message: String,
    },

    /// Invalid parameter provided
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// IO error during source resolution
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for mixsl operations
pub type Result<T> = std::result::Result<T, Error>;
