//! Ownership gate and validation for user-editable meta pages.
//!
//! Anyone may read a page; only its owner may edit or delete it. The API
//! hides the edit affordance using [`resolve_access`] and the store enforces
//! the same rule on every write (see `MetaPageRepo` in `ensemble-db`).

use serde::Serialize;

use crate::error::CoreError;
use crate::types::EntityId;

/// Maximum length of a page title, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum length of page content, in characters.
pub const MAX_CONTENT_LEN: usize = 100_000;

/// What the caller may do with a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageAccess {
    pub can_read: bool,
    pub can_edit: bool,
}

/// Decide the caller's access to a page owned by `owner`.
///
/// Reading is always allowed; editing requires the caller to be the owner.
/// An absent caller never edits.
pub fn resolve_access(owner: EntityId, caller: Option<EntityId>) -> PageAccess {
    PageAccess {
        can_read: true,
        can_edit: caller == Some(owner),
    }
}

/// Fail unless `caller` owns the page.
pub fn ensure_owner(owner: EntityId, caller: Option<EntityId>) -> Result<(), CoreError> {
    match caller {
        None => Err(CoreError::Unauthorized(
            "Sign in to edit meta pages".to_string(),
        )),
        Some(id) if id == owner => Ok(()),
        Some(_) => Err(CoreError::Forbidden(
            "Only the page owner may modify this page".to_string(),
        )),
    }
}

/// Validate a page title (non-blank, at most [`MAX_TITLE_LEN`] chars).
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("Title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate page content (may be empty, at most [`MAX_CONTENT_LEN`] chars).
pub fn validate_content(content: &str) -> Result<(), CoreError> {
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(CoreError::Validation(format!(
            "Content must be at most {MAX_CONTENT_LEN} characters"
        )));
    }
    Ok(())
}
