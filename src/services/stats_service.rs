//! Assignment statistics.

use crate::error::AppError;
use crate::models::{AssignmentStats, PullRequestAssignmentCount, UserAssignmentCount};
use crate::store::PullRequestStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct StatsService {
    pull_requests: Arc<dyn PullRequestStore>,
}

impl StatsService {
    pub fn new(pull_requests: Arc<dyn PullRequestStore>) -> Self {
        Self { pull_requests }
    }

    /// Assignment counts per reviewer and per pull request, sorted by id.
    pub async fn assignment_stats(&self) -> Result<AssignmentStats, AppError> {
        let by_reviewer = self.pull_requests.count_assignments_by_reviewer().await?;
        let by_pr = self.pull_requests.count_assignments_by_pull_request().await?;

        let mut by_user: Vec<UserAssignmentCount> = by_reviewer
            .into_iter()
            .map(|(user_id, assignments)| UserAssignmentCount {
                user_id,
                assignments,
            })
            .collect();
        by_user.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        let mut by_pull_request: Vec<PullRequestAssignmentCount> = by_pr
            .into_iter()
            .map(|(pull_request_id, assignments)| PullRequestAssignmentCount {
                pull_request_id,
                assignments,
            })
            .collect();
        by_pull_request.sort_by(|a, b| a.pull_request_id.cmp(&b.pull_request_id));

        Ok(AssignmentStats {
            by_user,
            by_pull_request,
        })
    }
}
