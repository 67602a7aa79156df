use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("SMTP protocol error: {0}")]
    SmtpProtocol(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Delivery timed out after {0}s")]
    Timeout(u64),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NotifyError>;
