//! Data types exchanged between the candidate sources, the page store, and
//! the recommendation orchestrator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One suggested keyword with its relevance weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub keyword: String,
    pub score: f64,
}

impl Candidate {
    pub fn new(keyword: impl Into<String>, score: f64) -> Self {
        Self {
            keyword: keyword.into(),
            score,
        }
    }

    /// Whether the score can act as a sampling weight (finite and > 0).
    pub fn has_positive_score(&self) -> bool {
        self.score.is_finite() && self.score > 0.0
    }
}

/// A page's id and keyword, as read from the page store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageKeyword {
    pub page_id: i64,
    pub keyword: String,
}

/// Where raw candidates come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    /// External search-trend service.
    Trend,
    /// Static word-embedding model.
    Embedding,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::Trend => "trend",
            CandidateSource::Embedding => "embedding",
        }
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidateSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trend" | "trends" => Ok(CandidateSource::Trend),
            "embedding" | "association" | "w2v" => Ok(CandidateSource::Embedding),
            other => Err(Error::InvalidInput(format!(
                "unknown candidate source: {}",
                other
            ))),
        }
    }
}

/// Final, down-sampled recommendation list in draw order.
///
/// Serializes as a bare JSON array of `{keyword, score}` objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecommendationResult(pub Vec<Candidate>);

impl RecommendationResult {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.0
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|c| c.keyword.as_str())
    }

    pub fn into_inner(self) -> Vec<Candidate> {
        self.0
    }
}

impl From<Vec<Candidate>> for RecommendationResult {
    fn from(candidates: Vec<Candidate>) -> Self {
        Self(candidates)
    }
}
