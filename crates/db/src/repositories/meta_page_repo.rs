//! Repository for the `meta_pages` table.
//!
//! Every write is conditioned on ownership in SQL, so the store stays the
//! enforcement boundary even if a caller skips the API-level check.

use ensemble_core::types::EntityId;
use sqlx::PgPool;

use crate::models::meta_page::MetaPage;

/// Column list for meta_pages queries.
const COLUMNS: &str = "id, owner_id, title, content, revision, created_at, updated_at";

/// Result of a conditional content save.
#[derive(Debug)]
pub enum SaveOutcome {
    /// The content was written; carries the updated row.
    Saved(MetaPage),
    /// No page with the given id exists.
    Missing,
    /// The page exists but belongs to someone else.
    NotOwner,
    /// An expected revision was supplied and no longer matches.
    Stale { current_revision: i32 },
}

/// Provides CRUD operations for meta pages.
pub struct MetaPageRepo;

impl MetaPageRepo {
    /// Create a new, empty page owned by `owner_id`.
    pub async fn create(
        pool: &PgPool,
        owner_id: EntityId,
        title: &str,
    ) -> Result<MetaPage, sqlx::Error> {
        let query = format!(
            "INSERT INTO meta_pages (owner_id, title, content)
             VALUES ($1, $2, '')
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MetaPage>(&query)
            .bind(owner_id)
            .bind(title)
            .fetch_one(pool)
            .await
    }

    /// Find a page by ID. Never creates a missing page.
    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<MetaPage>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM meta_pages WHERE id = $1");
        sqlx::query_as::<_, MetaPage>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all pages owned by `owner_id`, most recently updated first.
    pub async fn list_for_owner(
        pool: &PgPool,
        owner_id: EntityId,
    ) -> Result<Vec<MetaPage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM meta_pages
             WHERE owner_id = $1
             ORDER BY updated_at DESC"
        );
        sqlx::query_as::<_, MetaPage>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    /// Save page content if `owner_id` owns the page.
    ///
    /// With `expected_revision = None` the save is last-write-wins; with
    /// `Some(rev)` it only applies while the stored revision equals `rev`.
    pub async fn update_content(
        pool: &PgPool,
        id: EntityId,
        owner_id: EntityId,
        content: &str,
        expected_revision: Option<i32>,
    ) -> Result<SaveOutcome, sqlx::Error> {
        let query = format!(
            "UPDATE meta_pages SET
                content = $3,
                revision = revision + 1,
                updated_at = NOW()
             WHERE id = $1
               AND owner_id = $2
               AND ($4::INT IS NULL OR revision = $4)
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, MetaPage>(&query)
            .bind(id)
            .bind(owner_id)
            .bind(content)
            .bind(expected_revision)
            .fetch_optional(pool)
            .await?;

        if let Some(page) = updated {
            return Ok(SaveOutcome::Saved(page));
        }

        // Nothing matched: work out which condition failed.
        let outcome = match Self::find_by_id(pool, id).await? {
            None => SaveOutcome::Missing,
            Some(page) if page.owner_id != owner_id => SaveOutcome::NotOwner,
            Some(page) => SaveOutcome::Stale {
                current_revision: page.revision,
            },
        };
        tracing::debug!(page_id = %id, ?outcome, "Meta page save not applied");
        Ok(outcome)
    }

    /// Delete a page if `owner_id` owns it. Returns `true` if a row was removed.
    pub async fn delete(
        pool: &PgPool,
        id: EntityId,
        owner_id: EntityId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM meta_pages WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
