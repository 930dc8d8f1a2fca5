//! Error types shared across the pipeline.
//!
//! Only [`PulseError::InvalidReference`] is surfaced to callers of the
//! one-shot entry points. Every other kind is recovered from where it
//! happens: tier failures fall through to the next tier, store failures
//! degrade analytics to the synthetic snapshot, delivery failures are
//! isolated per subscriber.

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PulseError {
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Acquisition tier {tier} failed: {reason}")]
    AcquisitionTier { tier: &'static str, reason: String },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for PulseError {
    fn from(e: rusqlite::Error) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PulseError>;
