//! Word-embedding candidate source.
//!
//! The model artifact is read once per process. [`EmbeddingModelStore`]
//! parses it on first use on the blocking pool and then hands out shared,
//! read-only [`KeyedVectors`]. A failed load leaves the store empty so a
//! later request can try again.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use notekey_core::defaults;
use notekey_core::{Candidate, EmbeddingSource, Error, Result};

use crate::word2vec::{KeyedVectors, ModelFormat};

/// Where and how to read the embedding model.
#[derive(Debug, Clone)]
pub struct EmbeddingModelConfig {
    pub model_path: PathBuf,
    /// Explicit format; `None` picks by file extension.
    pub format: Option<ModelFormat>,
}

impl Default for EmbeddingModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(defaults::W2V_MODEL_PATH),
            format: None,
        }
    }
}

impl EmbeddingModelConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            format: None,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        let model_path = std::env::var("NOTEKEY_W2V_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(defaults::W2V_MODEL_PATH));
        let format = match std::env::var("NOTEKEY_W2V_FORMAT") {
            Ok(v) if !v.trim().is_empty() => Some(v.parse()?),
            _ => None,
        };
        Ok(Self { model_path, format })
    }

    pub fn with_format(mut self, format: ModelFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// The format that will be used to read `model_path`.
    pub fn resolved_format(&self) -> ModelFormat {
        self.format
            .unwrap_or_else(|| ModelFormat::from_path(&self.model_path))
    }
}

/// Lazily loaded, shared embedding model.
pub struct EmbeddingModelStore {
    config: EmbeddingModelConfig,
    model: OnceCell<Arc<KeyedVectors>>,
}

impl EmbeddingModelStore {
    pub fn new(config: EmbeddingModelConfig) -> Self {
        Self {
            config,
            model: OnceCell::new(),
        }
    }

    /// Wrap an already-built model. Nothing is read from disk.
    pub fn preloaded(model: KeyedVectors) -> Self {
        Self {
            config: EmbeddingModelConfig::default(),
            model: OnceCell::new_with(Some(Arc::new(model))),
        }
    }

    pub fn config(&self) -> &EmbeddingModelConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// The model, loading it on first call.
    pub async fn get(&self) -> Result<Arc<KeyedVectors>> {
        self.model
            .get_or_try_init(|| self.load())
            .await
            .map(Arc::clone)
    }

    #[instrument(skip(self), fields(subsystem = "sources", component = "word2vec", op = "load", path = %self.config.model_path.display()))]
    async fn load(&self) -> Result<Arc<KeyedVectors>> {
        let start = Instant::now();
        let path = self.config.model_path.clone();
        let format = self.config.resolved_format();

        let model = tokio::task::spawn_blocking(move || KeyedVectors::load(&path, format))
            .await
            .map_err(|e| Error::Internal(format!("Model load task failed: {}", e)))??;

        info!(
            vocab_size = model.len(),
            dimension = model.dimension(),
            format = ?format,
            duration_ms = start.elapsed().as_millis() as u64,
            "Embedding model loaded"
        );
        Ok(Arc::new(model))
    }
}

/// Embedding candidate source backed by a word2vec model.
#[derive(Clone)]
pub struct Word2VecSource {
    store: Arc<EmbeddingModelStore>,
}

impl Word2VecSource {
    pub fn new(store: Arc<EmbeddingModelStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<EmbeddingModelStore> {
        &self.store
    }
}

#[async_trait]
impl EmbeddingSource for Word2VecSource {
    #[instrument(skip(self), fields(subsystem = "sources", component = "word2vec", op = "fetch_embedding_candidates"))]
    async fn fetch_embedding_candidates(
        &self,
        keyword: &str,
        top_n: usize,
    ) -> Result<Vec<Candidate>> {
        let model = self.store.get().await?;
        let neighbors = model.most_similar(keyword, top_n)?;
        let neighbor_count = neighbors.len();

        // Similarities can be negative; those cannot act as sampling weights.
        let candidates: Vec<Candidate> = neighbors
            .into_iter()
            .map(|(word, sim)| Candidate::new(word, f64::from(sim)))
            .filter(Candidate::has_positive_score)
            .collect();

        debug!(
            neighbor_count,
            candidate_count = candidates.len(),
            "Embedding candidates fetched"
        );
        Ok(candidates)
    }
}
