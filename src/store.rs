//! Store abstractions consumed by the services.
//!
//! Services only see these traits; the SQLite implementation lives in
//! [`crate::db::SqliteStore`]. Every multi-row mutation is atomic inside the
//! implementation, so callers never manage transactions themselves.

use crate::error::AppError;
use crate::models::{PullRequest, PullRequestShort, Team, TeamDeactivation, User};
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Resolve a user, returning None if not found.
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError>;

    /// All members of a team, active and inactive, ordered by id.
    async fn list_by_team(&self, team_name: &str) -> Result<Vec<User>, AppError>;

    /// Flip one user's active flag, returning the updated user.
    async fn set_is_active(
        &self,
        user_id: &str,
        is_active: bool,
        now: i64,
    ) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait TeamStore: Send + Sync {
    async fn team_exists(&self, team_name: &str) -> Result<bool, AppError>;

    /// Create a team and upsert its members in one transaction.
    ///
    /// Existing users are moved into the new team.
    async fn create_team(&self, team_name: &str, members: &[User], now: i64)
        -> Result<(), AppError>;

    /// Fetch a team with its full roster.
    async fn get_team(&self, team_name: &str) -> Result<Option<Team>, AppError>;
}

#[async_trait]
pub trait PullRequestStore: Send + Sync {
    async fn pull_request_exists(&self, pr_id: &str) -> Result<bool, AppError>;

    /// Insert the pull request and all its reviewer rows atomically.
    async fn create_with_reviewers(&self, pr: &PullRequest) -> Result<(), AppError>;

    async fn get_pull_request(&self, pr_id: &str) -> Result<Option<PullRequest>, AppError>;

    /// Mark the pull request merged. An existing merge timestamp is kept.
    async fn set_merged(&self, pr_id: &str, merged_at: i64)
        -> Result<Option<PullRequest>, AppError>;

    /// Swap `old_reviewer_id` for `new_reviewer_id` in place, atomically.
    ///
    /// The swap only happens if, at write time, the pull request is still
    /// open, `old_reviewer_id` is still assigned, and `new_reviewer_id` is
    /// active and not already assigned. Otherwise it fails with `PR_MERGED`,
    /// `NOT_ASSIGNED` or `NO_CANDIDATE` and nothing changes.
    async fn replace_reviewer(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
        new_reviewer_id: &str,
    ) -> Result<Option<PullRequest>, AppError>;

    /// Pull requests where the user is an assigned reviewer, newest first.
    async fn list_by_reviewer(&self, user_id: &str) -> Result<Vec<PullRequestShort>, AppError>;

    /// Deactivate every active member of the team and repair the reviewer
    /// sets of all open pull requests they were reviewing, in one
    /// transaction.
    async fn deactivate_team_and_reassign(
        &self,
        team_name: &str,
        now: i64,
    ) -> Result<TeamDeactivation, AppError>;

    /// Number of assignments per reviewer id.
    async fn count_assignments_by_reviewer(&self) -> Result<HashMap<String, i64>, AppError>;

    /// Number of assigned reviewers per pull request id.
    async fn count_assignments_by_pull_request(&self) -> Result<HashMap<String, i64>, AppError>;
}
