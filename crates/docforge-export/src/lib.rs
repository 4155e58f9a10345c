pub mod archive;
pub mod error;
pub mod repository;
pub mod service;
pub mod sweeper;

pub use error::{ExportError, ExportResult};
pub use repository::ExportRepository;
pub use service::ExportService;
