use noteweave_core::{LibraryConfig, LinkerConfig, SuggestConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Contents of `noteweave.toml`. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteweaveConfig {
    /// Directory holding `noteweave.redb`.
    pub data_dir: PathBuf,
    /// fastembed model name. Leave unset to disable semantic suggestions.
    pub embedding_model: Option<String>,
    pub linker: LinkerSection,
    pub suggest: SuggestSection,
    pub backfill: BackfillSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkerSection {
    pub max_mentions: usize,
    pub max_context_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestSection {
    pub min_text_chars: usize,
    pub similarity_threshold: f32,
    pub overfetch_factor: usize,
    pub recent_window_days: i64,
    pub fallback_tag_weight: f32,
    pub fallback_recency_bonus: f32,
    pub fallback_base_score: f32,
    pub semantic_tag_weight: f32,
    pub semantic_tag_cap: f32,
    pub semantic_recency_bonus: f32,
    pub capability_timeout_ms: u64,
    pub max_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackfillSection {
    pub batch_size: usize,
}

impl Default for NoteweaveConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            embedding_model: None,
            linker: LinkerSection::default(),
            suggest: SuggestSection::default(),
            backfill: BackfillSection::default(),
        }
    }
}

impl Default for LinkerSection {
    fn default() -> Self {
        let core = LinkerConfig::default();
        Self {
            max_mentions: core.max_mentions,
            max_context_chars: core.max_context_chars,
        }
    }
}

impl Default for SuggestSection {
    fn default() -> Self {
        let core = SuggestConfig::default();
        Self {
            min_text_chars: core.min_text_chars,
            similarity_threshold: core.similarity_threshold,
            overfetch_factor: core.overfetch_factor,
            recent_window_days: core.recent_window.num_days(),
            fallback_tag_weight: core.fallback_tag_weight,
            fallback_recency_bonus: core.fallback_recency_bonus,
            fallback_base_score: core.fallback_base_score,
            semantic_tag_weight: core.semantic_tag_weight,
            semantic_tag_cap: core.semantic_tag_cap,
            semantic_recency_bonus: core.semantic_recency_bonus,
            capability_timeout_ms: core.capability_timeout.as_millis() as u64,
            max_limit: core.max_limit,
        }
    }
}

impl Default for BackfillSection {
    fn default() -> Self {
        Self { batch_size: 64 }
    }
}

impl NoteweaveConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Missing file means defaults; a broken file is logged and ignored.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("noteweave.redb")
    }

    pub fn linker_config(&self) -> LinkerConfig {
        LinkerConfig {
            max_mentions: self.linker.max_mentions,
            max_context_chars: self.linker.max_context_chars,
        }
    }

    pub fn suggest_config(&self) -> SuggestConfig {
        let s = &self.suggest;
        SuggestConfig {
            min_text_chars: s.min_text_chars,
            similarity_threshold: s.similarity_threshold,
            overfetch_factor: s.overfetch_factor,
            recent_window: chrono::Duration::days(s.recent_window_days),
            fallback_tag_weight: s.fallback_tag_weight,
            fallback_recency_bonus: s.fallback_recency_bonus,
            fallback_base_score: s.fallback_base_score,
            semantic_tag_weight: s.semantic_tag_weight,
            semantic_tag_cap: s.semantic_tag_cap,
            semantic_recency_bonus: s.semantic_recency_bonus,
            capability_timeout: Duration::from_millis(s.capability_timeout_ms),
            max_limit: s.max_limit,
        }
    }

    pub fn library_config(&self) -> LibraryConfig {
        LibraryConfig {
            embedding_model: self.embedding_model.clone(),
            linker: self.linker_config(),
            suggest: self.suggest_config(),
        }
    }

    /// Every problem found, not just the first.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Err(e) = self.linker_config().validate() {
            errors.push(format!("[linker] {}", e));
        }
        if let Err(e) = self.suggest_config().validate() {
            errors.push(format!("[suggest] {}", e));
        }
        if self.backfill.batch_size == 0 {
            errors.push("[backfill] batch_size must be > 0".to_string());
        }
        if let Some(model) = &self.embedding_model {
            if let Err(e) = noteweave_core::FastEmbedProvider::parse_model(model) {
                errors.push(format!("embedding_model: {}", e));
            }
        }

        errors
    }
}
