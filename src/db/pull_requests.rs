//! Pull request queries.

use crate::db::deactivation;
use crate::db::store::{fetch_reviewers, insert_reviewers, is_unique_violation, SqliteStore};
use crate::error::{store_err, AppError};
use crate::models::{
    PullRequest, PullRequestRow, PullRequestShort, PullRequestStatus, TeamDeactivation,
};
use crate::store::PullRequestStore;
use async_trait::async_trait;
use sqlx::SqliteConnection;
use std::collections::HashMap;

const SELECT_PULL_REQUEST: &str =
    "SELECT id, name, author_id, status, created_at, merged_at FROM pull_requests WHERE id = ?";

async fn load_pull_request(
    conn: &mut SqliteConnection,
    pr_id: &str,
) -> Result<Option<PullRequest>, AppError> {
    let row = sqlx::query_as::<_, PullRequestRow>(SELECT_PULL_REQUEST)
        .bind(pr_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(store_err("get pull request"))?;

    let Some(row) = row else {
        return Ok(None);
    };

    let reviewers = fetch_reviewers(conn, pr_id).await?;
    row.into_pull_request(reviewers).map(Some)
}

#[async_trait]
impl PullRequestStore for SqliteStore {
    async fn pull_request_exists(&self, pr_id: &str) -> Result<bool, AppError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM pull_requests WHERE id = ?")
            .bind(pr_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err("check pull request exists"))?;
        Ok(row.is_some())
    }

    async fn create_with_reviewers(&self, pr: &PullRequest) -> Result<(), AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(store_err("begin create pull request"))?;

        sqlx::query(
            r#"
            INSERT INTO pull_requests (id, name, author_id, status, created_at, merged_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&pr.id)
        .bind(&pr.name)
        .bind(&pr.author_id)
        .bind(pr.status.as_str())
        .bind(pr.created_at)
        .bind(pr.merged_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::pr_exists(&pr.id)
            } else {
                AppError::database_with_op(e.to_string(), "insert pull request")
            }
        })?;

        insert_reviewers(&mut tx, &pr.id, &pr.assigned_reviewers).await?;

        tx.commit()
            .await
            .map_err(store_err("commit create pull request"))?;
        Ok(())
    }

    async fn get_pull_request(&self, pr_id: &str) -> Result<Option<PullRequest>, AppError> {
        let mut conn = self.pool.acquire().await?;
        load_pull_request(&mut conn, pr_id).await
    }

    async fn set_merged(
        &self,
        pr_id: &str,
        merged_at: i64,
    ) -> Result<Option<PullRequest>, AppError> {
        let mut tx = self.pool.begin().await.map_err(store_err("begin merge"))?;

        // COALESCE keeps the first merge timestamp if two merges race
        let updated = sqlx::query(
            r#"
            UPDATE pull_requests
            SET status = ?, merged_at = COALESCE(merged_at, ?)
            WHERE id = ?
            "#,
        )
        .bind(PullRequestStatus::Merged.as_str())
        .bind(merged_at)
        .bind(pr_id)
        .execute(&mut *tx)
        .await
        .map_err(store_err("set merged"))?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        let pr = load_pull_request(&mut tx, pr_id).await?;
        tx.commit().await.map_err(store_err("commit merge"))?;
        Ok(pr)
    }

    async fn replace_reviewer(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
        new_reviewer_id: &str,
    ) -> Result<Option<PullRequest>, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(store_err("begin replace reviewer"))?;

        // Swap one slot in place, and only while every precondition still
        // holds. The write comes first so the check and the swap happen
        // under the same write lock.
        let swapped = sqlx::query(
            r#"
            UPDATE pull_request_reviewers
            SET reviewer_id = ?
            WHERE pr_id = ? AND reviewer_id = ?
              AND EXISTS (SELECT 1 FROM pull_requests WHERE id = ? AND status = 'OPEN')
              AND EXISTS (SELECT 1 FROM users WHERE id = ? AND is_active = 1)
              AND NOT EXISTS (
                  SELECT 1 FROM pull_request_reviewers WHERE pr_id = ? AND reviewer_id = ?
              )
            "#,
        )
        .bind(new_reviewer_id)
        .bind(pr_id)
        .bind(old_reviewer_id)
        .bind(pr_id)
        .bind(new_reviewer_id)
        .bind(pr_id)
        .bind(new_reviewer_id)
        .execute(&mut *tx)
        .await
        .map_err(store_err("replace reviewer"))?;

        let Some(current) = load_pull_request(&mut tx, pr_id).await? else {
            return Ok(None);
        };

        if swapped.rows_affected() != 1 {
            // Work out which precondition no longer holds
            current.ensure_open()?;
            if !current.has_reviewer(old_reviewer_id) {
                return Err(AppError::not_assigned(pr_id, old_reviewer_id));
            }
            return Err(AppError::no_candidate(pr_id));
        }

        tx.commit()
            .await
            .map_err(store_err("commit replace reviewer"))?;
        Ok(Some(current))
    }

    async fn list_by_reviewer(&self, user_id: &str) -> Result<Vec<PullRequestShort>, AppError> {
        let rows = sqlx::query_as::<_, PullRequestRow>(
            r#"
            SELECT p.id, p.name, p.author_id, p.status, p.created_at, p.merged_at
            FROM pull_requests p
            INNER JOIN pull_request_reviewers r ON p.id = r.pr_id
            WHERE r.reviewer_id = ?
            ORDER BY p.created_at DESC, p.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err("list pull requests by reviewer"))?;

        rows.into_iter().map(PullRequestShort::try_from).collect()
    }

    async fn deactivate_team_and_reassign(
        &self,
        team_name: &str,
        now: i64,
    ) -> Result<TeamDeactivation, AppError> {
        deactivation::deactivate_team_and_reassign(&self.pool, team_name, now).await
    }

    async fn count_assignments_by_reviewer(&self) -> Result<HashMap<String, i64>, AppError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT reviewer_id, COUNT(*) FROM pull_request_reviewers GROUP BY reviewer_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_err("count assignments by reviewer"))?;
        Ok(rows.into_iter().collect())
    }

    async fn count_assignments_by_pull_request(&self) -> Result<HashMap<String, i64>, AppError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT pr_id, COUNT(*) FROM pull_request_reviewers GROUP BY pr_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_err("count assignments by pull request"))?;
        Ok(rows.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::models::User;
    use crate::store::TeamStore;
    use tempfile::tempdir;

    async fn setup_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempdir().unwrap();
        let pool = crate::db::initialize(&dir.path().join("test.db"), 2)
            .await
            .unwrap();
        let store = SqliteStore::new(pool);

        let members: Vec<User> = ["a", "b", "c", "d"]
            .iter()
            .map(|id| User {
                id: id.to_string(),
                username: id.to_uppercase(),
                team_name: "core".into(),
                is_active: true,
            })
            .collect();
        store.create_team("core", &members, 1).await.unwrap();
        (dir, store)
    }

    fn open_pr(id: &str, reviewers: &[&str]) -> PullRequest {
        PullRequest {
            id: id.into(),
            name: format!("PR {}", id),
            author_id: "a".into(),
            status: PullRequestStatus::Open,
            assigned_reviewers: reviewers.iter().map(|s| s.to_string()).collect(),
            created_at: 100,
            merged_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_preserves_reviewer_order() {
        let (_dir, store) = setup_store().await;

        store.create_with_reviewers(&open_pr("p1", &["d", "b"])).await.unwrap();

        let pr = store.get_pull_request("p1").await.unwrap().unwrap();
        assert_eq!(pr.assigned_reviewers, vec!["d", "b"]);
        assert_eq!(pr.status, PullRequestStatus::Open);
        assert!(store.pull_request_exists("p1").await.unwrap());
        assert!(store.get_pull_request("zzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_is_atomic_on_bad_reviewer() {
        let (_dir, store) = setup_store().await;

        // "ghost" violates the users foreign key, so nothing may be written
        let err = store
            .create_with_reviewers(&open_pr("p1", &["b", "ghost"]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StoreFailure);

        assert!(!store.pull_request_exists("p1").await.unwrap());
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pull_request_reviewers")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn test_duplicate_create_maps_to_pr_exists() {
        let (_dir, store) = setup_store().await;

        store.create_with_reviewers(&open_pr("p1", &[])).await.unwrap();
        let err = store
            .create_with_reviewers(&open_pr("p1", &[]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PrExists);
    }

    #[tokio::test]
    async fn test_set_merged_keeps_first_timestamp() {
        let (_dir, store) = setup_store().await;
        store.create_with_reviewers(&open_pr("p1", &["b"])).await.unwrap();

        let first = store.set_merged("p1", 200).await.unwrap().unwrap();
        assert_eq!(first.merged_at, Some(200));
        assert_eq!(first.assigned_reviewers, vec!["b"]);

        let second = store.set_merged("p1", 300).await.unwrap().unwrap();
        assert_eq!(second.merged_at, Some(200));

        assert!(store.set_merged("missing", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_reviewer_swaps_one_slot() {
        let (_dir, store) = setup_store().await;
        store.create_with_reviewers(&open_pr("p1", &["b", "c"])).await.unwrap();

        let updated = store.replace_reviewer("p1", "b", "d").await.unwrap().unwrap();
        assert_eq!(updated.assigned_reviewers, vec!["d", "c"]);

        assert!(store.replace_reviewer("zzz", "b", "d").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_reviewer_rechecks_preconditions() {
        let (_dir, store) = setup_store().await;
        store.create_with_reviewers(&open_pr("p1", &["b", "c"])).await.unwrap();

        // Old reviewer no longer on the pull request
        let err = store.replace_reviewer("p1", "d", "a").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotAssigned);

        // Replacement already reviewing
        let err = store.replace_reviewer("p1", "b", "c").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoCandidate);

        // Replacement deactivated since it was picked
        sqlx::query("UPDATE users SET is_active = 0 WHERE id = 'd'")
            .execute(store.pool())
            .await
            .unwrap();
        let err = store.replace_reviewer("p1", "b", "d").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoCandidate);

        store.set_merged("p1", 200).await.unwrap();
        let err = store.replace_reviewer("p1", "b", "a").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PrMerged);

        let pr = store.get_pull_request("p1").await.unwrap().unwrap();
        assert_eq!(pr.assigned_reviewers, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_list_by_reviewer_and_counts() {
        let (_dir, store) = setup_store().await;
        store.create_with_reviewers(&open_pr("p1", &["b", "c"])).await.unwrap();
        let mut p2 = open_pr("p2", &["b"]);
        p2.created_at = 500;
        store.create_with_reviewers(&p2).await.unwrap();

        let listed = store.list_by_reviewer("b").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|p| p.pull_request_id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p1"]);
        assert!(store.list_by_reviewer("a").await.unwrap().is_empty());

        let by_reviewer = store.count_assignments_by_reviewer().await.unwrap();
        assert_eq!(by_reviewer.get("b"), Some(&2));
        assert_eq!(by_reviewer.get("c"), Some(&1));

        let by_pr = store.count_assignments_by_pull_request().await.unwrap();
        assert_eq!(by_pr.get("p1"), Some(&2));
        assert_eq!(by_pr.get("p2"), Some(&1));
    }
}
