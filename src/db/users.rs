//! User queries.

use crate::db::store::SqliteStore;
use crate::error::{store_err, AppError};
use crate::models::User;
use crate::store::UserStore;
use async_trait::async_trait;

#[async_trait]
impl UserStore for SqliteStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, team_name, is_active FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err("get user by id"))
    }

    async fn list_by_team(&self, team_name: &str) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, team_name, is_active
            FROM users
            WHERE team_name = ?
            ORDER BY id
            "#,
        )
        .bind(team_name)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err("list users by team"))
    }

    async fn set_is_active(
        &self,
        user_id: &str,
        is_active: bool,
        now: i64,
    ) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_active = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, username, team_name, is_active
            "#,
        )
        .bind(is_active)
        .bind(now)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err("set user is_active"))
    }
}
