//! User activation and review listings.

use crate::error::AppError;
use crate::models::{PullRequestShort, User};
use crate::services::clock::Clock;
use crate::services::pr_service::require;
use crate::store::{PullRequestStore, UserStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    pull_requests: Arc<dyn PullRequestStore>,
    clock: Arc<dyn Clock>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserStore>,
        pull_requests: Arc<dyn PullRequestStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            pull_requests,
            clock,
        }
    }

    /// Flip one user's active flag.
    ///
    /// Existing assignments are left alone; only team deactivation repairs
    /// reviewer sets.
    pub async fn set_active(&self, user_id: &str, is_active: bool) -> Result<User, AppError> {
        require("user_id", user_id)?;
        let user = self
            .users
            .set_is_active(user_id, is_active, self.clock.unix_now())
            .await?
            .ok_or_else(|| AppError::not_found_with_id("User", user_id))?;

        log::info!("[users] Set {} is_active={}", user_id, is_active);
        Ok(user)
    }

    /// Pull requests the user is reviewing or has reviewed, newest first.
    pub async fn list_assigned_pull_requests(
        &self,
        user_id: &str,
    ) -> Result<Vec<PullRequestShort>, AppError> {
        require("user_id", user_id)?;
        self.pull_requests.list_by_reviewer(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::error::ErrorCode;
    use crate::models::{PullRequest, PullRequestStatus};
    use crate::services::clock::FixedClock;
    use crate::store::TeamStore;
    use tempfile::tempdir;

    async fn setup() -> (tempfile::TempDir, SqliteStore, UserService) {
        let dir = tempdir().unwrap();
        let pool = crate::db::initialize(&dir.path().join("test.db"), 2)
            .await
            .unwrap();
        let store = SqliteStore::new(pool);
        let members: Vec<User> = ["a", "b"]
            .iter()
            .map(|id| User {
                id: id.to_string(),
                username: id.to_uppercase(),
                team_name: "backend".into(),
                is_active: true,
            })
            .collect();
        store.create_team("backend", &members, 1).await.unwrap();

        let shared = Arc::new(store.clone());
        let service = UserService::new(shared.clone(), shared, Arc::new(FixedClock::at_unix(9)));
        (dir, store, service)
    }

    #[tokio::test]
    async fn test_set_active() {
        let (_dir, _store, service) = setup().await;

        let user = service.set_active("b", false).await.unwrap();
        assert!(!user.is_active);
        assert_eq!(user.team_name, "backend");

        let err = service.set_active("ghost", true).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_deactivated_user_keeps_assignments() {
        let (_dir, store, service) = setup().await;
        store
            .create_with_reviewers(&PullRequest {
                id: "p1".into(),
                name: "Fix".into(),
                author_id: "a".into(),
                status: PullRequestStatus::Open,
                assigned_reviewers: vec!["b".into()],
                created_at: 1,
                merged_at: None,
            })
            .await
            .unwrap();

        service.set_active("b", false).await.unwrap();

        let listed = service.list_assigned_pull_requests("b").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].pull_request_id, "p1");
        assert!(service.list_assigned_pull_requests("a").await.unwrap().is_empty());
    }
}
