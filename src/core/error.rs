//! Error types for dymod.

use crate::env::ExitKind;
use thiserror::Error;

/// Result type alias for dymod operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while binding into the host runtime.
#[derive(Error, Debug)]
pub enum Error {
    // Declaration errors
    #[error("Invalid arity: min {min}, max {max}")]
    InvalidArity { min: isize, max: isize },

    #[error("Invalid string: {0}")]
    InvalidString(String),

    // Call errors
    #[error("Wrong number of arguments: expected {expected}, got {got}")]
    WrongArgCount { expected: String, got: usize },

    #[error("Wrong type argument: expected {0}")]
    WrongType(&'static str),

    #[error("Integer overflow: {0}")]
    IntegerOverflow(String),

    #[error("Non-local exit pending in host: {0}")]
    NonLocalExit(ExitKind),

    #[error("Instance already in use: {0}")]
    Reentrant(String),

    #[error("Native code panicked: {0}")]
    Panic(String),

    // Load errors
    #[error("Host runtime too small: {size} bytes, need {required}")]
    IncompatibleRuntime { size: isize, required: usize },

    #[error("Host environment too old: {size} bytes, need {required}")]
    IncompatibleEnv { size: isize, required: usize },

    #[error("Host environment lacks {0}")]
    MissingEntry(&'static str),

    #[error("Self-check failed: {0}")]
    SelfCheckFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Host error symbol this error is signalled as.
    pub fn signal_symbol(&self) -> &'static str {
        match self {
            Error::WrongArgCount { .. } => "wrong-number-of-arguments",
            Error::WrongType(_) => "wrong-type-argument",
            Error::IntegerOverflow(_) => "overflow-error",
            _ => "error",
        }
    }
}

impl From<std::ffi::NulError> for Error {
    fn from(err: std::ffi::NulError) -> Self {
        Error::InvalidString(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::InvalidString(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}
