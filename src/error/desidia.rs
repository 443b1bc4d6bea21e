use thiserror::Error as ThisError;

use super::api::ApiError;

/// Infrastructure-level failures: persistence, actor plumbing, bootstrap.
///
/// Request failures stay [`ApiError`]; this type wraps one when it crosses into
/// wiring code such as the binary.
#[derive(Debug, ThisError)]
pub enum DesidiaError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}
