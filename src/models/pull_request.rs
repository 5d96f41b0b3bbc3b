//! Pull request model and lifecycle.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

/// Maximum number of reviewers assigned under normal assignment rules.
pub const REVIEWER_CAP: usize = 2;

/// Lifecycle state of a pull request.
///
/// `Open` is the initial state and `Merged` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PullRequestStatus {
    Open,
    Merged,
}

impl PullRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Merged => "MERGED",
        }
    }

    /// Whether `self -> next` is a legal transition.
    ///
    /// Merged -> Merged is allowed because merge is idempotent; it is a
    /// no-op rather than a state change.
    pub fn can_transition_to(&self, next: PullRequestStatus) -> bool {
        matches!(
            (self, next),
            (Self::Open, Self::Merged) | (Self::Merged, Self::Merged)
        )
    }
}

impl TryFrom<&str> for PullRequestStatus {
    type Error = AppError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "OPEN" => Ok(Self::Open),
            "MERGED" => Ok(Self::Merged),
            other => Err(AppError::internal(format!(
                "unknown pull request status: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for PullRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pull request with its ordered reviewer set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    #[serde(rename = "pull_request_id")]
    pub id: String,

    #[serde(rename = "pull_request_name")]
    pub name: String,

    pub author_id: String,

    pub status: PullRequestStatus,

    /// Reviewer user ids in assignment order.
    pub assigned_reviewers: Vec<String>,

    /// Creation timestamp (Unix).
    pub created_at: i64,

    /// Merge timestamp (Unix, if merged).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<i64>,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.status == PullRequestStatus::Merged
    }

    /// Reject reviewer mutations once the pull request is merged.
    pub fn ensure_open(&self) -> Result<(), AppError> {
        if self.is_merged() {
            return Err(AppError::pr_merged(&self.id));
        }
        Ok(())
    }

    pub fn has_reviewer(&self, user_id: &str) -> bool {
        self.assigned_reviewers.iter().any(|r| r == user_id)
    }
}

/// Row shape of the `pull_requests` table.
#[derive(Debug, Clone, FromRow)]
pub struct PullRequestRow {
    pub id: String,
    pub name: String,
    pub author_id: String,
    pub status: String,
    pub created_at: i64,
    pub merged_at: Option<i64>,
}

impl PullRequestRow {
    /// Combine the row with its reviewers.
    pub fn into_pull_request(self, reviewers: Vec<String>) -> Result<PullRequest, AppError> {
        Ok(PullRequest {
            status: PullRequestStatus::try_from(self.status.as_str())?,
            id: self.id,
            name: self.name,
            author_id: self.author_id,
            assigned_reviewers: reviewers,
            created_at: self.created_at,
            merged_at: self.merged_at,
        })
    }
}

/// Pull request summary without reviewers, used in per-user listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestShort {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: PullRequestStatus,
}

impl TryFrom<PullRequestRow> for PullRequestShort {
    type Error = AppError;

    fn try_from(row: PullRequestRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: PullRequestStatus::try_from(row.status.as_str())?,
            pull_request_id: row.id,
            pull_request_name: row.name,
            author_id: row.author_id,
        })
    }
}
