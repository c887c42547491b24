use std::io;

use thiserror::Error;

/// Errors produced while ingesting targets and assigning colors.
///
/// Data-quality problems (NaN node values, constant distributions) are
/// never reported here; they are logged and recovered from.
#[derive(Debug, Error)]
pub enum ColorError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("parse error on line {line}: {details}")]
    Parse { line: usize, details: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ColorError>;

impl ColorError {
    pub(crate) fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        ColorError::InvalidArgument(msg.into())
    }

    pub(crate) fn invalid_state<S: Into<String>>(msg: S) -> Self {
        ColorError::InvalidState(msg.into())
    }
}
