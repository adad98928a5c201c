use crate::suggest::SuggestConfig;
use crate::types::Suggestion;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Distinct tags present on both sides
pub fn shared_tag_count(subject_tags: &[String], candidate_tags: &[String]) -> usize {
    let mut seen = HashSet::new();
    candidate_tags
        .iter()
        .filter(|tag| subject_tags.contains(tag) && seen.insert(tag.as_str()))
        .count()
}

pub fn is_recent(created_at: DateTime<Utc>, now: DateTime<Utc>, config: &SuggestConfig) -> bool {
    now - created_at <= config.recent_window
}

/// `shared × 0.2 + (0.1 if recent)`
pub fn fallback_score(shared_tags: usize, recent: bool, config: &SuggestConfig) -> f32 {
    let recency = if recent {
        config.fallback_recency_bonus
    } else {
        0.0
    };
    shared_tags as f32 * config.fallback_tag_weight + recency
}

/// `similarity + min(shared × 0.1, 0.3) + (0.05 if recent)`
pub fn semantic_score(
    similarity: f32,
    shared_tags: usize,
    recent: bool,
    config: &SuggestConfig,
) -> f32 {
    let tags = (shared_tags as f32 * config.semantic_tag_weight).min(config.semantic_tag_cap);
    let recency = if recent {
        config.semantic_recency_bonus
    } else {
        0.0
    };
    similarity + tags + recency
}

/// Score descending, then newer first, then larger (later v7) id
pub fn rank_order(a: &Suggestion, b: &Suggestion) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then(b.created_at.cmp(&a.created_at))
        .then(b.id.cmp(&a.id))
}
