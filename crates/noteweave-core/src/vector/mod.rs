mod capability;
mod embedding;
mod index;
mod search;

pub use capability::{guard, Capability, Unavailable};
pub use embedding::{embedding_input, Disabled, EmbeddingProvider, FastEmbedProvider};
pub use index::{cosine_similarity, HnswIndex, SimilarityResult, VectorIndex};
pub use search::{LocalVectorSearch, SimilarityMatch, VectorSearch};
