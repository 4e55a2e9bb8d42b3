//! Error taxonomy of the resolution engine.
//!
//! Two failure families are kept apart: errors that abort a
//! resolution ([`ResolutionError`]) and the "could not decide" signal a
//! strategy reports through its outcome, which never shows up here.

use thiserror::Error;

use crate::fingerprint::Fingerprint;

/// Failures of the persistent store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing storage could not be reached or used.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A result for this fingerprint has already been written.
    #[error("a result for fingerprint {0} already exists")]
    DuplicateFingerprint(Fingerprint),

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store document could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the error is the uniqueness conflict on result fingerprints.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::DuplicateFingerprint(_))
    }
}

/// Errors that terminate a resolution request.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The caller handed in something the engine cannot work with, e.g. an
    /// empty product set. Never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A packing backend broke its own postconditions (more than one box for
    /// a minimum-count request, or a box id the catalog does not know).
    #[error("packing engine inconsistency: {0}")]
    EngineInconsistency(String),

    /// The persistent store failed.
    #[error("infrastructure failure: {0}")]
    Infrastructure(#[from] StoreError),
}

impl ResolutionError {
    pub fn invalid_input(details: impl Into<String>) -> Self {
        ResolutionError::InvalidInput(details.into())
    }

    pub fn inconsistency(details: impl Into<String>) -> Self {
        ResolutionError::EngineInconsistency(details.into())
    }

    /// Short machine-readable code, used in logs and HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ResolutionError::InvalidInput(_) => "invalid_input",
            ResolutionError::EngineInconsistency(_) => "engine_inconsistency",
            ResolutionError::Infrastructure(_) => "infrastructure_failure",
        }
    }
}
