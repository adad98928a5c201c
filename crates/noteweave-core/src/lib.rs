pub mod types;
pub mod storage;
pub mod error;
pub mod linker;
pub mod notify;
pub mod vector;
pub mod suggest;
pub mod api;

pub use error::{NoteweaveError, Result};
pub use types::*;
pub use storage::{NoteFilter, RedbStorage, Storage, StorageStats, CURRENT_SCHEMA_VERSION};
pub use api::{BackfillReport, LibraryConfig, Noteweave};
pub use linker::{
    clip_context, extract_context, extract_mentions, pick_target, GraphSynchronizer,
    LinkerConfig, LinkerMetrics, Mention, SyncReport, TargetResolver,
};
pub use notify::{
    drain_outbox, LinkCreated, MemorySink, NotificationSink, NullSink, OutboxSink,
};
pub use vector::{
    cosine_similarity, embedding_input, guard, Capability, Disabled, EmbeddingProvider,
    FastEmbedProvider, HnswIndex, LocalVectorSearch, SimilarityMatch, SimilarityResult,
    Unavailable, VectorIndex, VectorSearch,
};
pub use suggest::{SuggestConfig, SuggestRequest, SuggestionRanker};
