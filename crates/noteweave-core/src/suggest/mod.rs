//! Related-note suggestions
//!
//! Two ranking paths:
//! - Semantic: vector similarity plus capped tag overlap and a recency bonus
//! - Fallback: tag overlap and recency only, or newest notes when untagged
//!
//! The semantic path needs an embedding and a vector search; when either
//! is missing, fails or times out the ranker quietly uses the fallback.

mod config;
mod ranker;
mod scoring;

#[cfg(test)]
mod tests;

pub use config::SuggestConfig;
pub use ranker::{SuggestRequest, SuggestionRanker};
pub use scoring::{fallback_score, is_recent, rank_order, semantic_score, shared_tag_count};
