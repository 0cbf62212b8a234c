//! Error type shared by the library and the command line front end.

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// A parent handed to an operator breaks the recombination contract.
    #[error("invalid parent {which}: {reason}")]
    InvalidParent { which: usize, reason: String },
    #[error("invalid instance: {0}")]
    InvalidInstance(String),
    /// An adjacency array that does not encode a single cycle over all cities.
    #[error("adjacency does not form a Hamiltonian cycle: {0}")]
    NotHamiltonian(String),
    /// Broken internal invariant. Always a bug, never a data problem.
    #[error("internal invariant violated: {0}")]
    Internal(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_parent(which: usize, reason: impl Into<String>) -> Self {
        Self::InvalidParent {
            which,
            reason: reason.into(),
        }
    }

    pub fn invalid_instance(message: impl Into<String>) -> Self {
        Self::InvalidInstance(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
