//! Error types for Spendcast

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    /// Caller supplied a bad period unit, date, or similar; never retried
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A store query needed for the result failed
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Cancellation token fired or the deadline elapsed
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl Error {
    /// Wrap any store failure as `Unavailable`, keeping cancellation and
    /// argument errors as they are.
    pub fn into_unavailable(self) -> Self {
        match self {
            Self::Cancelled(_) | Self::InvalidArgument(_) | Self::Unavailable(_) => self,
            other => Self::Unavailable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
