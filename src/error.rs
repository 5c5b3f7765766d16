use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignificanceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid contingency table {cells}: {message}")]
    InvalidTable { cells: String, message: String },

    #[error("Unknown p-value correction method: {0}")]
    UnknownMethod(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid parameter: {name} = {value}, {message}")]
    InvalidParameter {
        name: String,
        value: String,
        message: String,
    },
}

/// Type alias for Result with SignificanceError
pub type Result<T> = std::result::Result<T, SignificanceError>;

impl SignificanceError {
    /// Create a new InvalidTable error
    pub fn invalid_table(cells: impl fmt::Display, message: impl Into<String>) -> Self {
        SignificanceError::InvalidTable {
            cells: cells.to_string(),
            message: message.into(),
        }
    }

    /// Create a new UnknownMethod error
    pub fn unknown_method(name: impl Into<String>) -> Self {
        SignificanceError::UnknownMethod(name.into())
    }

    /// Create a new InvalidFileFormat error
    pub fn invalid_file_format(message: impl Into<String>) -> Self {
        SignificanceError::InvalidFileFormat(message.into())
    }

    /// Create a new InvalidParameter error
    pub fn invalid_parameter(
        name: impl Into<String>,
        value: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        SignificanceError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            message: message.into(),
        }
    }
}
