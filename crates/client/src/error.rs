use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Setup errors: loading configuration and building the HTTP client.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid base_url: {0}")]
    InvalidUrl(String),
}
