use crate::error::{NoteweaveError, Result};

/// Configuration for the graph synchroniser
#[derive(Debug, Clone)]
pub struct LinkerConfig {
    /// Mentions processed per sync. Anything beyond is ignored with a
    /// warning. Default: 500.
    pub max_mentions: usize,

    /// Longest stored context, in chars. Longer sentences are clipped
    /// around the mention. Default: 500.
    pub max_context_chars: usize,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            max_mentions: 500,
            max_context_chars: 500,
        }
    }
}

impl LinkerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_mentions(mut self, max: usize) -> Self {
        self.max_mentions = max.max(1);
        self
    }

    /// Clamped to at least 16 so a short mention always fits.
    pub fn with_max_context_chars(mut self, max: usize) -> Self {
        self.max_context_chars = max.max(16);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_mentions == 0 {
            return Err(NoteweaveError::Validation(
                "max_mentions must be > 0".into(),
            ));
        }

        if self.max_context_chars < 16 {
            return Err(NoteweaveError::Validation(
                "max_context_chars must be >= 16".into(),
            ));
        }

        Ok(())
    }
}
