// src/error.rs

//! The engine's error taxonomy.
//!
//! Every fallible engine operation returns this single enum so that the CLI
//! dispatcher can map failures to exit codes (see [`crate::cli`]) without
//! matching on ad-hoc strings.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("usage error: {0}")]
    Usage(String),

    #[error("recipe error: {0}")]
    Recipe(String),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("extract error: {0}")]
    Extract(String),

    #[error("patch error: {0}")]
    Patch(String),

    #[error("phase '{phase}' failed: {reason}")]
    Phase { phase: String, reason: String },

    #[error("package '{0}' is not installed")]
    NotInstalled(String),

    #[error("pack error: {0}")]
    Pack(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Exit code mapping per the command surface contract (§6).
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Usage(_) | Error::NotInstalled(_) | Error::Pack(_) => 2,
            Error::Fetch(_) => 3,
            Error::Extract(_) => 4,
            _ => 1,
        }
    }
}
