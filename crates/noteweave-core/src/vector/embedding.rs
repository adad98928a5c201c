use crate::error::{NoteweaveError, Result};
use crate::types::{Embedding, Note};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding as FastEmbedModel};
use std::sync::Arc;

/// Turns text into a fixed-size vector. May be absent or fail.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Batch embedding. Defaults to one call per text.
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Embedding>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in &texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Embedding dimension for the current model.
    fn dimension(&self) -> usize;

    /// Model identifier string.
    fn model_name(&self) -> &str;

    /// False for providers that never produce vectors.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// FastEmbed-based provider. Inference runs on the blocking pool.
pub struct FastEmbedProvider {
    model: Arc<FastEmbedModel>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedProvider {
    /// Create a provider with the default model
    pub fn new() -> Result<Self> {
        Self::with_model(EmbeddingModel::BGESmallENV15)
    }

    /// Create a provider with a specific model
    pub fn with_model(model: EmbeddingModel) -> Result<Self> {
        let init_options = InitOptions::new(model.clone());

        let fastembed_model = FastEmbedModel::try_new(init_options).map_err(|e| {
            NoteweaveError::Capability(format!("Failed to initialize FastEmbed: {}", e))
        })?;

        let model_name = format!("{:?}", model);
        let dimension = match model {
            EmbeddingModel::BGESmallENV15 => 384,
            EmbeddingModel::BGEBaseENV15 => 768,
            EmbeddingModel::BGELargeENV15 => 1024,
            EmbeddingModel::AllMiniLML6V2 => 384,
            EmbeddingModel::AllMiniLML12V2 => 384,
            _ => 384,
        };

        Ok(Self {
            model: Arc::new(fastembed_model),
            model_name,
            dimension,
        })
    }

    /// Parse a model name as accepted on the command line
    pub fn parse_model(name: &str) -> Result<EmbeddingModel> {
        match name.to_ascii_lowercase().as_str() {
            "bge-small-en-v1.5" | "bgesmallenv15" => Ok(EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" | "bgebaseenv15" => Ok(EmbeddingModel::BGEBaseENV15),
            "bge-large-en-v1.5" | "bgelargeenv15" => Ok(EmbeddingModel::BGELargeENV15),
            "all-minilm-l6-v2" | "allminilml6v2" => Ok(EmbeddingModel::AllMiniLML6V2),
            "all-minilm-l12-v2" | "allminilml12v2" => Ok(EmbeddingModel::AllMiniLML12V2),
            other => Err(NoteweaveError::Validation(format!(
                "Unknown embedding model '{}'",
                other
            ))),
        }
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Embedding>> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || model.embed(texts, None))
            .await
            .map_err(|e| NoteweaveError::Capability(format!("Embedding task panicked: {}", e)))?
            .map_err(|e| NoteweaveError::Capability(format!("Embedding failed: {}", e)))
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.run(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| NoteweaveError::Capability("No embedding generated".to_string()))
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.run(texts).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Provider used when no model is configured. Always unavailable.
pub struct Disabled;

#[async_trait]
impl EmbeddingProvider for Disabled {
    async fn embed(&self, _text: &str) -> Result<Embedding> {
        Err(NoteweaveError::Capability(
            "Embedding provider not configured".to_string(),
        ))
    }

    fn dimension(&self) -> usize {
        0
    }

    fn model_name(&self) -> &str {
        "disabled"
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[async_trait]
impl<E: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<E> {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        (**self).embed(text).await
    }
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Embedding>> {
        (**self).embed_batch(texts).await
    }
    fn dimension(&self) -> usize {
        (**self).dimension()
    }
    fn model_name(&self) -> &str {
        (**self).model_name()
    }
    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }
}

/// Generate the embedding input text for a note
pub fn embedding_input(note: &Note) -> String {
    if note.tags.is_empty() {
        format!("{}\n{}", note.title, note.body)
    } else {
        format!("{}\n{}\ntags: {}", note.title, note.body, note.tags.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Visibility;

    #[test]
    fn test_embedding_input_format() {
        let note = Note::new("alice", Visibility::Public, "Test title", "Test body content")
            .with_tags(["physics", "notes"]);

        let input = embedding_input(&note);
        assert!(input.starts_with("Test title\n"));
        assert!(input.contains("Test body content"));
        assert!(input.ends_with("tags: physics, notes"));
    }

    #[test]
    fn test_parse_model() {
        assert!(matches!(
            FastEmbedProvider::parse_model("BGE-Small-EN-v1.5"),
            Ok(EmbeddingModel::BGESmallENV15)
        ));
        assert!(FastEmbedProvider::parse_model("word2vec").is_err());
    }

    #[tokio::test]
    async fn test_disabled_provider() {
        let provider = Disabled;
        assert!(!provider.is_enabled());
        assert!(provider.embed("anything").await.is_err());
    }

    #[tokio::test]
    #[ignore] // Requires downloading model
    async fn test_fastembed_provider() {
        let provider = FastEmbedProvider::new().unwrap();

        assert_eq!(provider.dimension(), 384);

        let embedding = provider
            .embed("This is a test sentence for embedding generation.")
            .await
            .unwrap();
        assert_eq!(embedding.len(), 384);
    }

    #[tokio::test]
    #[ignore] // Requires downloading model
    async fn test_similar_texts_high_similarity() {
        let provider = FastEmbedProvider::new().unwrap();

        let emb1 = provider.embed("The cat sat on the mat").await.unwrap();
        let emb2 = provider.embed("A cat was sitting on a mat").await.unwrap();

        let similarity = crate::vector::cosine_similarity(&emb1, &emb2);
        assert!(similarity > 0.7, "Similar texts should have high similarity: {}", similarity);
    }
}
