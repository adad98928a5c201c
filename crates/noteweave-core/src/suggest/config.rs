use crate::error::{NoteweaveError, Result};
use chrono::Duration as ChronoDuration;
use std::time::Duration;

/// Scoring and degradation knobs for the suggestion ranker
#[derive(Debug, Clone)]
pub struct SuggestConfig {
    /// Subject text shorter than this (trimmed, in chars) skips the
    /// semantic path. Default: 20.
    pub min_text_chars: usize,

    /// Minimum cosine similarity for a semantic candidate. Default: 0.5.
    pub similarity_threshold: f32,

    /// Vector search asks for `limit * overfetch_factor` hits so exclusion
    /// still leaves enough. Default: 3.
    pub overfetch_factor: usize,

    /// Notes created within this window get a recency bonus. Default: 7 days.
    pub recent_window: ChronoDuration,

    /// Fallback: score per shared tag. Default: 0.2.
    pub fallback_tag_weight: f32,

    /// Fallback: recency bonus. Default: 0.1.
    pub fallback_recency_bonus: f32,

    /// Fallback: flat score when the subject has no tags. Default: 0.1.
    pub fallback_base_score: f32,

    /// Semantic: score per shared tag. Default: 0.1.
    pub semantic_tag_weight: f32,

    /// Semantic: cap on the tag component. Default: 0.3.
    pub semantic_tag_cap: f32,

    /// Semantic: recency bonus. Default: 0.05.
    pub semantic_recency_bonus: f32,

    /// Budget for each embedding or vector search call. Default: 5s.
    pub capability_timeout: Duration,

    /// Requested limits are clamped to this. Default: 100.
    pub max_limit: usize,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 20,
            similarity_threshold: 0.5,
            overfetch_factor: 3,
            recent_window: ChronoDuration::days(7),
            fallback_tag_weight: 0.2,
            fallback_recency_bonus: 0.1,
            fallback_base_score: 0.1,
            semantic_tag_weight: 0.1,
            semantic_tag_cap: 0.3,
            semantic_recency_bonus: 0.05,
            capability_timeout: Duration::from_secs(5),
            max_limit: 100,
        }
    }
}

impl SuggestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_text_chars(mut self, chars: usize) -> Self {
        self.min_text_chars = chars;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_overfetch_factor(mut self, factor: usize) -> Self {
        self.overfetch_factor = factor.max(1);
        self
    }

    pub fn with_recent_window(mut self, window: ChronoDuration) -> Self {
        self.recent_window = window;
        self
    }

    pub fn with_capability_timeout(mut self, timeout: Duration) -> Self {
        self.capability_timeout = timeout;
        self
    }

    pub fn with_max_limit(mut self, max: usize) -> Self {
        self.max_limit = max.max(1);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(NoteweaveError::Validation(
                "similarity_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        if self.overfetch_factor == 0 {
            return Err(NoteweaveError::Validation(
                "overfetch_factor must be > 0".into(),
            ));
        }

        if self.recent_window < ChronoDuration::zero() {
            return Err(NoteweaveError::Validation(
                "recent_window must not be negative".into(),
            ));
        }

        let weights = [
            ("fallback_tag_weight", self.fallback_tag_weight),
            ("fallback_recency_bonus", self.fallback_recency_bonus),
            ("fallback_base_score", self.fallback_base_score),
            ("semantic_tag_weight", self.semantic_tag_weight),
            ("semantic_tag_cap", self.semantic_tag_cap),
            ("semantic_recency_bonus", self.semantic_recency_bonus),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(NoteweaveError::Validation(format!(
                    "{} must be a non-negative number",
                    name
                )));
            }
        }

        if self.capability_timeout.is_zero() {
            return Err(NoteweaveError::Validation(
                "capability_timeout must be > 0".into(),
            ));
        }

        if self.max_limit == 0 {
            return Err(NoteweaveError::Validation("max_limit must be > 0".into()));
        }

        Ok(())
    }
}
