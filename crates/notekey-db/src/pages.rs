//! Page store implementation.
//!
//! Reads the `pages` table (`id`, `note_id`, `keyword`, ...) to resolve a
//! page's owning note and the keywords already used across that note.
//! Integer ids are widened to BIGINT in the queries so INTEGER and BIGINT
//! schemas both decode as `i64`.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, instrument};

use notekey_core::{Error, PageKeyword, PageStore, Result};

/// PostgreSQL implementation of PageStore.
#[derive(Clone)]
pub struct PgPageStore {
    pool: Pool<Postgres>,
}

impl PgPageStore {
    /// Create a new PgPageStore with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PageStore for PgPageStore {
    #[instrument(skip(self), fields(subsystem = "db", component = "pages", op = "find_note_id"))]
    async fn find_note_id_by_page_id(&self, page_id: i64) -> Result<Option<i64>> {
        let row = sqlx::query("SELECT note_id::BIGINT AS note_id FROM pages WHERE id = $1")
            .bind(page_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        let note_id = match row {
            Some(row) => Some(row.try_get::<i64, _>("note_id").map_err(Error::Database)?),
            None => None,
        };

        debug!(found = note_id.is_some(), "Resolved page to note");
        Ok(note_id)
    }

    #[instrument(skip(self), fields(subsystem = "db", component = "pages", op = "find_keywords"))]
    async fn find_keywords_by_note_id(&self, note_id: i64) -> Result<Vec<PageKeyword>> {
        let rows = sqlx::query(
            "SELECT id::BIGINT AS id, keyword FROM pages
             WHERE note_id = $1 AND keyword IS NOT NULL
             ORDER BY id",
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let keywords = rows
            .into_iter()
            .map(|row| {
                Ok(PageKeyword {
                    page_id: row.try_get("id")?,
                    keyword: row.try_get("keyword")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(Error::Database)?;

        debug!(result_count = keywords.len(), "Loaded note keywords");
        Ok(keywords)
    }
}
