//! Recommendation orchestrator.
//!
//! `recommend` resolves the page to its note, collects the keywords every
//! page of that note already uses, pulls raw candidates from the requested
//! source, and hands them to [`sampling::select`]. Any failure along the way
//! becomes one [`RecommendationError`]; partial results are never returned.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use notekey_core::defaults;
use notekey_core::{
    Candidate, CandidateSource, EmbeddingSource, Error, PageStore, RecommendationResult, Result,
    TrendSource,
};

use crate::error::RecommendationError;
use crate::sampling;

/// Orchestrator settings.
#[derive(Debug, Clone)]
pub struct RecommendConfig {
    /// Maximum keywords per result.
    pub output_size: usize,
    /// Raw neighbors requested from the embedding source.
    pub embedding_top_n: usize,
    /// Report an empty selection as `EmptyCandidateSet` instead of `[]`.
    pub empty_as_error: bool,
    /// Fixed seed for reproducible draws. `None` uses the thread RNG.
    pub sample_seed: Option<u64>,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            output_size: defaults::OUTPUT_SIZE,
            embedding_top_n: defaults::EMBEDDING_TOP_N,
            empty_as_error: false,
            sample_seed: None,
        }
    }
}

impl RecommendConfig {
    /// Create from environment variables, falling back to defaults.
    ///
    /// `NOTEKEY_OUTPUT_SIZE` and `NOTEKEY_EMBEDDING_TOP_N` must be positive.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base = Self::default();
        Ok(Self {
            output_size: positive(&lookup, "NOTEKEY_OUTPUT_SIZE")?.unwrap_or(base.output_size),
            embedding_top_n: positive(&lookup, "NOTEKEY_EMBEDDING_TOP_N")?
                .unwrap_or(base.embedding_top_n),
            empty_as_error: lookup("NOTEKEY_EMPTY_AS_ERROR")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(base.empty_as_error),
            sample_seed: match lookup("NOTEKEY_SAMPLE_SEED") {
                Some(v) => Some(v.trim().parse().map_err(|_| {
                    Error::Config(format!("NOTEKEY_SAMPLE_SEED must be an integer, got '{}'", v))
                })?),
                None => None,
            },
        })
    }
}

fn positive(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<usize>> {
    match lookup(key) {
        None => Ok(None),
        Some(v) => match v.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(Error::Config(format!(
                "{} must be a positive integer, got '{}'",
                key, v
            ))),
        },
    }
}

/// Keyword recommendation engine.
///
/// Holds only shared, read-only collaborators; concurrent calls do not
/// coordinate with each other.
pub struct RecommendationEngine {
    pages: Arc<dyn PageStore>,
    trends: Arc<dyn TrendSource>,
    embeddings: Arc<dyn EmbeddingSource>,
    config: RecommendConfig,
}

impl RecommendationEngine {
    pub fn new(
        pages: Arc<dyn PageStore>,
        trends: Arc<dyn TrendSource>,
        embeddings: Arc<dyn EmbeddingSource>,
    ) -> Self {
        Self {
            pages,
            trends,
            embeddings,
            config: RecommendConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RecommendConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RecommendConfig {
        &self.config
    }

    /// Recommend keywords related to `keyword` using the trend service.
    pub async fn recommend_by_trend(
        &self,
        keyword: &str,
        page_id: i64,
    ) -> std::result::Result<RecommendationResult, RecommendationError> {
        self.recommend(keyword, page_id, CandidateSource::Trend)
            .await
    }

    /// Recommend keywords related to `keyword` using the embedding model.
    pub async fn recommend_by_embedding(
        &self,
        keyword: &str,
        page_id: i64,
    ) -> std::result::Result<RecommendationResult, RecommendationError> {
        self.recommend(keyword, page_id, CandidateSource::Embedding)
            .await
    }

    /// Run the full pipeline for one keyword on one page.
    #[instrument(skip(self), fields(subsystem = "recommend", component = "engine", op = "recommend", request_id = %Uuid::now_v7()))]
    pub async fn recommend(
        &self,
        keyword: &str,
        page_id: i64,
        source: CandidateSource,
    ) -> std::result::Result<RecommendationResult, RecommendationError> {
        let start = Instant::now();
        match self.run(keyword, page_id, source).await {
            Ok(result) => {
                info!(
                    result_count = result.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Recommendation complete"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(
                    kind = ?e.kind(),
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Recommendation failed"
                );
                Err(e.into())
            }
        }
    }

    async fn run(
        &self,
        keyword: &str,
        page_id: i64,
        source: CandidateSource,
    ) -> Result<RecommendationResult> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(Error::InvalidInput("keyword must not be empty".into()));
        }

        let excluded = self.existing_keywords(page_id).await?;

        let raw = match source {
            CandidateSource::Trend => self.trends.fetch_trend_candidates(keyword).await?,
            CandidateSource::Embedding => {
                self.embeddings
                    .fetch_embedding_candidates(keyword, self.config.embedding_top_n)
                    .await?
            }
        };
        debug!(
            candidate_count = raw.len(),
            excluded_count = excluded.len(),
            "Raw candidates fetched"
        );

        let selected = self.sample(raw, &excluded);
        if selected.is_empty() && self.config.empty_as_error {
            return Err(Error::EmptyCandidateSet {
                excluded: excluded.len(),
            });
        }
        Ok(selected.into())
    }

    /// Keywords used by any page of the note that owns `page_id`.
    pub async fn existing_keywords(&self, page_id: i64) -> Result<HashSet<String>> {
        let note_id = self
            .pages
            .find_note_id_by_page_id(page_id)
            .await?
            .ok_or(Error::PageNotFound(page_id))?;

        let pages = self.pages.find_keywords_by_note_id(note_id).await?;
        debug!(note_id, page_count = pages.len(), "Note keywords loaded");

        Ok(pages.into_iter().map(|p| p.keyword).collect())
    }

    fn sample(&self, raw: Vec<Candidate>, excluded: &HashSet<String>) -> Vec<Candidate> {
        let output_size = self.config.output_size;
        match self.config.sample_seed {
            Some(seed) => sampling::select(
                raw,
                excluded,
                output_size,
                &mut StdRng::seed_from_u64(seed),
            ),
            None => sampling::select(raw, excluded, output_size, &mut rand::thread_rng()),
        }
    }
}
