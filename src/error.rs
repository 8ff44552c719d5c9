use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication failure: {0}")]
    Auth(String),

    #[error("User @{0} not found")]
    UserNotFound(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Analytics query error: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
