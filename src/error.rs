//! Unified error type for precdiff.
//!
//! Categories mirror spec §7: file access is fatal and short-circuits to
//! exit code 2; malformed tokens are recorded via [`crate::types::Flags`]
//! and never abort the walk; config errors are fatal at startup.

use std::path::PathBuf;

/// Which side of the comparison an I/O error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::A => write!(f, "file A"),
            Side::B => write!(f, "file B"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    /// Inability to open or read a side. Fatal; maps to exit code 2.
    #[error("failed to access {side} ({}): {message}", .path.display())]
    FileAccess {
        side: Side,
        path: PathBuf,
        message: String,
    },

    /// A token could not be parsed as a number. Non-fatal: the affected
    /// column is skipped and `Flags::error_found` is raised.
    #[error("malformed number at line {line}, column {column}")]
    MalformedNumber { line: u64, column: usize },

    /// A parenthesized complex token was missing a comma or closing paren.
    #[error("malformed complex number at line {line}, column {column}")]
    MalformedComplex { line: u64, column: usize },

    /// Invalid threshold combination supplied at startup.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CompareError {
    pub fn file_access(side: Side, path: impl Into<PathBuf>, source: &std::io::Error) -> Self {
        CompareError::FileAccess {
            side,
            path: path.into(),
            message: source.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompareError>;
