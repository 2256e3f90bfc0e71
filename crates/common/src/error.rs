use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The feed answered but had no usable candles.
    #[error("No market data: {0}")]
    DataUnavailable(String),

    #[error("Authorization failed: {0}")]
    AuthFailed(String),

    /// Business-rule rejection, e.g. insufficient balance or a bad instrument.
    #[error("Rejected by venue: {0}")]
    RejectedByVenue(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// The venue answered with something we could not interpret.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors that end the run instead of skipping the current unit of work.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::AuthFailed(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
