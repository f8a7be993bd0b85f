//! In-memory collaborators for engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use notekey_core::{
    Candidate, EmbeddingSource, Error, PageKeyword, PageStore, Result, TrendSource,
};

/// Page store over a fixed `page_id -> (note_id, keyword)` table.
#[derive(Default)]
pub struct MockPageStore {
    pages: HashMap<i64, (i64, String)>,
    fail_with: Option<String>,
}

impl MockPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page_id: i64, note_id: i64, keyword: &str) -> Self {
        self.pages.insert(page_id, (note_id, keyword.to_string()));
        self
    }

    /// Every lookup fails with a database-style error.
    pub fn failing(message: &str) -> Self {
        Self {
            pages: HashMap::new(),
            fail_with: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl PageStore for MockPageStore {
    async fn find_note_id_by_page_id(&self, page_id: i64) -> Result<Option<i64>> {
        if let Some(msg) = &self.fail_with {
            return Err(Error::Database(sqlx_protocol_error(msg)));
        }
        Ok(self.pages.get(&page_id).map(|(note_id, _)| *note_id))
    }

    async fn find_keywords_by_note_id(&self, note_id: i64) -> Result<Vec<PageKeyword>> {
        let mut keywords: Vec<PageKeyword> = self
            .pages
            .iter()
            .filter(|(_, (owner, _))| *owner == note_id)
            .map(|(page_id, (_, keyword))| PageKeyword {
                page_id: *page_id,
                keyword: keyword.clone(),
            })
            .collect();
        keywords.sort_by_key(|p| p.page_id);
        Ok(keywords)
    }
}

fn sqlx_protocol_error(msg: &str) -> sqlx::Error {
    sqlx::Error::Protocol(msg.to_string())
}

/// Candidate source that returns a canned list or a canned error, and
/// records every call.
pub struct MockSource {
    candidates: Vec<Candidate>,
    error: Option<fn(&str) -> Error>,
    calls: AtomicUsize,
    last_request: Mutex<Option<(String, usize)>>,
}

impl MockSource {
    pub fn returning(pairs: &[(&str, f64)]) -> Self {
        Self {
            candidates: pairs.iter().map(|(k, s)| Candidate::new(*k, *s)).collect(),
            error: None,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing(error: fn(&str) -> Error) -> Self {
        Self {
            candidates: Vec::new(),
            error: Some(error),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(String, usize)> {
        self.last_request.lock().unwrap().clone()
    }

    fn respond(&self, keyword: &str, top_n: usize) -> Result<Vec<Candidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some((keyword.to_string(), top_n));
        match self.error {
            Some(make_error) => Err(make_error(keyword)),
            None => Ok(self.candidates.clone()),
        }
    }
}

#[async_trait]
impl TrendSource for MockSource {
    async fn fetch_trend_candidates(&self, keyword: &str) -> Result<Vec<Candidate>> {
        self.respond(keyword, 0)
    }
}

#[async_trait]
impl EmbeddingSource for MockSource {
    async fn fetch_embedding_candidates(
        &self,
        keyword: &str,
        top_n: usize,
    ) -> Result<Vec<Candidate>> {
        self.respond(keyword, top_n)
    }
}
