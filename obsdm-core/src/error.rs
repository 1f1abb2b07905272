//! # Error Handling
//!
//! Error types for OBSDM table operations.
//!
//! One enum covers the whole engine: key collisions, uniqueness violations,
//! frozen-attribute access, missing values, and every malformed-input path of
//! the XML, MIME and binary codecs.

use thiserror::Error;

/// Result type alias for OBSDM operations
pub type Result<T> = std::result::Result<T, Error>;

/// Primary error type for OBSDM
#[derive(Error, Debug)]
pub enum Error {
    /// A row with the stated key is already present in the table.
    #[error("duplicate key in {table}: {key}")]
    DuplicateKey { table: String, key: String },

    /// Another row already carries the same mandatory value attributes.
    #[error("uniqueness violation in {table}: {message}")]
    UniquenessViolation { table: String, message: String },

    /// Malformed XML, binary or MIME input, a missing mandatory envelope
    /// block, a schema construction fault, or an unreadable/unwritable
    /// backing file.
    #[error("conversion error: {message}")]
    Conversion { message: String },

    /// Mutation of a key attribute after the row was added to its table.
    #[error("illegal access: {message}")]
    IllegalAccess { message: String },

    /// A row lacks a value that the current operation requires.
    #[error("no such row value: {message}")]
    NoSuchRow { message: String },

    /// A binary read ran past the available bytes, or a declared length is
    /// inconsistent with the actual content.
    #[error("malformed stream: {message}")]
    MalformedStream { message: String },

    #[error("IO error: {message}")]
    Io { message: String, source: std::io::Error },
}

impl Error {
    /// Get error code for monitoring
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::DuplicateKey { .. } => "DUPLICATE_KEY",
            Error::UniquenessViolation { .. } => "UNIQUENESS_VIOLATION",
            Error::Conversion { .. } => "CONVERSION_ERROR",
            Error::IllegalAccess { .. } => "ILLEGAL_ACCESS",
            Error::NoSuchRow { .. } => "NO_SUCH_ROW",
            Error::MalformedStream { .. } => "MALFORMED_STREAM",
            Error::Io { .. } => "IO_ERROR",
        }
    }

    /// Shorthand for a [`Error::Conversion`] with a formatted message.
    pub fn conversion(message: impl Into<String>) -> Self {
        Error::Conversion { message: message.into() }
    }

    /// Shorthand for a [`Error::MalformedStream`] with a formatted message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedStream { message: message.into() }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}
