use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("epic_number is required for plan_epic documents")]
    MissingEpicNumber,
}

pub type DocumentResult<T> = Result<T, DocumentError>;
