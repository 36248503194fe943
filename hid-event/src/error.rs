//! Decoding error types

use thiserror::Error;

/// Errors that can occur while decoding a raw-input notification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HidError {
    /// The notification is not a raw-input message
    #[error("Not a raw input notification: message 0x{message:04X}")]
    NotApplicable { message: u32 },

    /// A required collaborator could not supply its data
    #[error("{what} unavailable: {reason}")]
    Unavailable { what: &'static str, reason: String },

    /// A report slice would extend past the end of the buffer
    #[error("Report {index} out of bounds: needs {end} bytes, buffer has {len}")]
    OutOfBounds { index: usize, end: usize, len: usize },

    /// A single report could not be resolved to a usage
    #[error("Parse failure: {0}")]
    ParseFailure(String),
}

impl HidError {
    /// Shorthand for [`HidError::Unavailable`]
    pub fn unavailable(what: &'static str, reason: impl Into<String>) -> Self {
        HidError::Unavailable {
            what,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`HidError::ParseFailure`]
    pub fn parse(reason: impl Into<String>) -> Self {
        HidError::ParseFailure(reason.into())
    }
}
