//! Repository for the `users` table.

use ensemble_core::types::EntityId;
use sqlx::PgPool;

use crate::models::user::User;

/// Column list for users queries.
const COLUMNS: &str = "id, is_anonymous, created_at";

/// Provides identity storage for anonymous sign-in.
pub struct UserRepo;

impl UserRepo {
    /// Create a fresh anonymous identity.
    pub async fn create_anonymous(pool: &PgPool) -> Result<User, sqlx::Error> {
        let query = format!("INSERT INTO users (is_anonymous) VALUES (true) RETURNING {COLUMNS}");
        sqlx::query_as::<_, User>(&query).fetch_one(pool).await
    }

    /// Find a user by ID.
    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
