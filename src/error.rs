use thiserror::Error;

#[derive(Debug, Error)]
pub enum PointsError {
    #[error("missing API token: set SCENE_API_TOKEN or pass --token")]
    MissingToken,

    #[error("invalid API token: {0}")]
    InvalidToken(&'static str),

    #[error("invalid date range: start {start} must be before or equal to end {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid or unexpected response format: {0}")]
    InvalidResponse(#[source] serde_json::Error),

    #[error("api rejected request: {0}")]
    Api(#[from] ApiError),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not authorized (401), the token is missing or expired")]
    Unauthorized,

    #[error("forbidden (403)")]
    Forbidden,

    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Broad class of a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any request was sent.
    Configuration,
    /// The request failed or the server answered with something unusable.
    Transport,
}

impl PointsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PointsError::MissingToken
            | PointsError::InvalidToken(_)
            | PointsError::InvalidDateRange { .. }
            | PointsError::InvalidParameter(_) => ErrorKind::Configuration,
            PointsError::Http(_) | PointsError::InvalidResponse(_) | PointsError::Api(_) => {
                ErrorKind::Transport
            }
        }
    }
}

/// A points amount that is not a decimal integer.
///
/// Recoverable: the transaction is skipped and the run goes on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transaction {point_id}: points value {raw:?} is not an integer")]
pub struct InvalidPoints {
    pub point_id: String,
    pub raw: String,
}
