//! Error types for Menagerie core.

use std::path::PathBuf;
use std::{error::Error, fmt, io};

/// Error type for Menagerie core operations.
#[derive(Debug)]
pub enum MenagerieError {
    /// An underlying I/O error.
    Io(io::Error),
    /// The scan root does not exist or is not a directory.
    InvalidRoot(PathBuf),
    /// A catch-all error with a message.
    Other(String),
}

impl fmt::Display for MenagerieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::InvalidRoot(path) => {
                write!(f, "scan root is not a directory: {}", path.display())
            }
            Self::Other(message) => write!(f, "{message}"),
        }
    }
}

impl Error for MenagerieError {}

impl From<io::Error> for MenagerieError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Convenience result type for Menagerie core.
pub type Result<T> = std::result::Result<T, MenagerieError>;
