pub mod error;
pub mod repository;

pub use error::{DocumentError, DocumentResult};
pub use repository::DocumentRepository;
