//! Knowledge indexing primitives
//!
//! Text chunking, embedding models and cosine-similarity ranking used by
//! the knowledge base functions.

pub mod chunker;
pub mod embedding;
pub mod vector;

pub use chunker::{DEFAULT_MAX_CHUNK_CHARS, chunk_text};
pub use embedding::{EmbeddingModel, HashingEmbeddingModel, OpenAiEmbeddingModel, create_embedding_model};
pub use vector::{checked_cosine_similarity, ScoredItem, cosine_similarity, rank_by_similarity};
