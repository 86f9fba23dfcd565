//! Domain errors
//!
//! Locally-recoverable conditions (malformed truncate fields, bad escapes,
//! unresolvable files) never reach this enum; they are absorbed where they
//! occur. What remains here is the small set of failures a caller may want
//! to match on.

use thiserror::Error;

/// Errors surfaced to the CLI driver
#[derive(Error, Debug)]
pub enum CatxError {
    /// Regex syntax errors are user input errors and abort the run
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// I/O failure while the pager owns the terminal
    #[error("pager i/o error: {0}")]
    PagerIo(#[from] std::io::Error),

    /// End-of-input or interrupt at a prompt boundary
    #[error("operation cancelled")]
    Cancelled,
}
