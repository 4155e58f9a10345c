use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("document store error: {0}")]
    Document(#[from] docforge_documents::DocumentError),
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("export not found: {0}")]
    NotFound(String),
    #[error("requested expiry of {0}h is outside the allowed range [1, 168]")]
    InvalidExpiry(i64),
}

pub type ExportResult<T> = Result<T, ExportError>;
