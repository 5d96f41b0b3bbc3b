//! Team queries.

use crate::db::store::{is_unique_violation, SqliteStore};
use crate::error::{store_err, AppError};
use crate::models::{Team, User};
use crate::store::{TeamStore, UserStore};
use async_trait::async_trait;

#[async_trait]
impl TeamStore for SqliteStore {
    async fn team_exists(&self, team_name: &str) -> Result<bool, AppError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM teams WHERE name = ?")
            .bind(team_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err("check team exists"))?;
        Ok(row.is_some())
    }

    async fn create_team(
        &self,
        team_name: &str,
        members: &[User],
        now: i64,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(store_err("begin create team"))?;

        sqlx::query("INSERT INTO teams (name, created_at) VALUES (?, ?)")
            .bind(team_name)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::team_exists(team_name)
                } else {
                    AppError::database_with_op(e.to_string(), "insert team")
                }
            })?;

        for member in members {
            sqlx::query(
                r#"
                INSERT INTO users (id, username, team_name, is_active, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    username = excluded.username,
                    team_name = excluded.team_name,
                    is_active = excluded.is_active,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&member.id)
            .bind(&member.username)
            .bind(team_name)
            .bind(member.is_active)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::database_with_op(e.to_string(), format!("upsert user {}", member.id))
            })?;
        }

        tx.commit().await.map_err(store_err("commit create team"))?;
        Ok(())
    }

    async fn get_team(&self, team_name: &str) -> Result<Option<Team>, AppError> {
        if !self.team_exists(team_name).await? {
            return Ok(None);
        }
        let members = self.list_by_team(team_name).await?;
        Ok(Some(Team::new(team_name, &members)))
    }
}
