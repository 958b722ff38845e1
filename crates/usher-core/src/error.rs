//! Error types for Usher Core

use thiserror::Error;

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, Error>;

/// Controller error types
#[derive(Error, Debug)]
pub enum Error {
    // Resolution errors
    #[error("no playable codec variant for this asset")]
    NoPlayableCodec,

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // Engine errors
    #[error("engine failed to load source: {0}")]
    EngineLoad(String),

    #[error("engine reported a fatal decode failure: {0}")]
    EngineDecode(String),

    #[error("invalid playback state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("no active playback session")]
    NoActiveSession,

    // Remote service errors
    #[error("failed to fetch catalog: {0}")]
    CatalogFetch(String),

    #[error("state sync delivery failed: {0}")]
    SyncDelivery(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl Error {
    /// Returns true if the operation can be retried without a fresh session.
    ///
    /// `NoPlayableCodec` counts as recoverable: the caller may retry the
    /// same asset through the transmuxed fallback.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NoPlayableCodec
                | Error::CatalogFetch(_)
                | Error::SyncDelivery(_)
                | Error::Network(_)
        )
    }
}
