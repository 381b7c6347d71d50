use mission_common::CacheError;
use thiserror::Error;

/// Failures of the mission read operations.
///
/// `Clone` so that one in-flight upstream outcome can be handed to every
/// caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MissionError {
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream returned malformed data: {0}")]
    UpstreamMalformed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl From<reqwest::Error> for MissionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            MissionError::UpstreamMalformed(e.to_string())
        } else {
            MissionError::UpstreamUnavailable(e.to_string())
        }
    }
}

impl From<serde_json::Error> for MissionError {
    fn from(e: serde_json::Error) -> Self {
        MissionError::UpstreamMalformed(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MissionError>;
