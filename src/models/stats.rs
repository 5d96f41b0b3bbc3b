//! Assignment statistics model.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAssignmentCount {
    pub user_id: String,
    pub assignments: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestAssignmentCount {
    pub pull_request_id: String,
    pub assignments: i64,
}

/// Assignment counts, each list sorted by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentStats {
    pub by_user: Vec<UserAssignmentCount>,
    pub by_pull_request: Vec<PullRequestAssignmentCount>,
}
