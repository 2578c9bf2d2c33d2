use thiserror::Error;

pub type Result<T> = std::result::Result<T, MetricsError>;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Extraction error in {repository}: {message}")]
    Extraction { repository: String, message: String },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Commit {0} not found")]
    NotFound(i64),
    #[error("Store connection error: {0}")]
    Connection(String),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MetricsError {
    pub fn extraction(repository: impl Into<String>, message: impl Into<String>) -> Self {
        MetricsError::Extraction {
            repository: repository.into(),
            message: message.into(),
        }
    }
}
