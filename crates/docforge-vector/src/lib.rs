pub mod chunking;
pub mod db;
pub mod manager;
pub mod types;

pub use chunking::{chunk_text, chunk_text_semantic, ChunkingConfig, TextChunk, Tokenizer};
pub use manager::{EmbeddingRoute, VectorStore};
pub use types::{SearchFilters, VectorError, VectorPoint, VectorResult, VectorSearchResult};
