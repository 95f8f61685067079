//! User-editable meta page models.

use ensemble_core::meta_page::PageAccess;
use ensemble_core::types::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `meta_pages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MetaPage {
    pub id: EntityId,
    pub owner_id: EntityId,
    pub title: String,
    pub content: String,
    /// Incremented on every content save.
    pub revision: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new meta page.
#[derive(Debug, Deserialize)]
pub struct CreateMetaPage {
    pub title: String,
}

/// DTO for saving page content.
#[derive(Debug, Deserialize)]
pub struct UpdateMetaPageContent {
    pub content: String,
    /// When set, the save only applies if the stored revision still matches.
    /// When absent, the save is last-write-wins.
    pub expected_revision: Option<i32>,
}

/// A page together with the caller's access rights.
#[derive(Debug, Serialize)]
pub struct MetaPageView {
    #[serde(flatten)]
    pub page: MetaPage,
    #[serde(flatten)]
    pub access: PageAccess,
}
