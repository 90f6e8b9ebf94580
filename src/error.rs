//! Error types for folio.
//!
//! Only conditions that make a render meaningless surface here. Formatting
//! oddities (bad colors, unterminated fences, unparsable dates, glyphs the
//! output encoding cannot carry) are logged and recovered where they occur.

use std::io;
use thiserror::Error;

/// Result type alias for folio operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a render.
#[derive(Error, Debug)]
pub enum Error {
    /// The entry point was handed nothing to render.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A theme could not be found or parsed.
    #[error("Theme error: {0}")]
    Theme(String),

    /// I/O error when reading input or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serializing the laid-out pages failed.
    #[error("Output error: {0}")]
    Output(String),
}
