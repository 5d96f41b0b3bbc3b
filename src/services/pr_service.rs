//! Reviewer assignment engine.
//!
//! Creation picks up to two reviewers from the author's team, reassignment
//! swaps one reviewer for a teammate of the reviewer being replaced, and
//! team deactivation repairs every open pull request in one transaction.
//! Randomness and time come from injected [`ReviewerSelector`] and [`Clock`]
//! implementations.

use crate::error::AppError;
use crate::models::{PullRequest, PullRequestStatus, TeamDeactivation, REVIEWER_CAP};
use crate::services::candidates::{filter_candidates, ReviewerSelector};
use crate::services::clock::Clock;
use crate::store::{PullRequestStore, UserStore};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of replacing one reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reassignment {
    #[serde(rename = "pr")]
    pub pull_request: PullRequest,
    /// The user who took over the old reviewer's slot.
    pub replaced_by: String,
}

#[derive(Clone)]
pub struct PullRequestService {
    pull_requests: Arc<dyn PullRequestStore>,
    users: Arc<dyn UserStore>,
    selector: Arc<dyn ReviewerSelector>,
    clock: Arc<dyn Clock>,
}

impl PullRequestService {
    pub fn new(
        pull_requests: Arc<dyn PullRequestStore>,
        users: Arc<dyn UserStore>,
        selector: Arc<dyn ReviewerSelector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pull_requests,
            users,
            selector,
            clock,
        }
    }

    /// Create an open pull request with up to two reviewers drawn from the
    /// author's active teammates.
    pub async fn create(
        &self,
        pr_id: &str,
        name: &str,
        author_id: &str,
    ) -> Result<PullRequest, AppError> {
        require("pull_request_id", pr_id)?;
        require("pull_request_name", name)?;
        require("author_id", author_id)?;

        if self.pull_requests.pull_request_exists(pr_id).await? {
            return Err(AppError::pr_exists(pr_id));
        }

        let author = self
            .users
            .get_user(author_id)
            .await?
            .ok_or_else(|| AppError::not_found_with_id("User", author_id))?;

        let roster = self.users.list_by_team(&author.team_name).await?;
        let candidates = filter_candidates(&author.id, &HashSet::new(), &roster);
        let reviewers = self.selector.select(&candidates, REVIEWER_CAP);

        let pr = PullRequest {
            id: pr_id.to_string(),
            name: name.to_string(),
            author_id: author.id,
            status: PullRequestStatus::Open,
            assigned_reviewers: reviewers,
            created_at: self.clock.unix_now(),
            merged_at: None,
        };

        self.pull_requests.create_with_reviewers(&pr).await?;

        log::info!(
            "[reviewers] Created pull request {} with reviewers {:?}",
            pr.id,
            pr.assigned_reviewers
        );
        Ok(pr)
    }

    /// Merge a pull request. Merging an already merged pull request returns
    /// it unchanged.
    pub async fn merge(&self, pr_id: &str) -> Result<PullRequest, AppError> {
        require("pull_request_id", pr_id)?;

        let pr = self
            .pull_requests
            .get_pull_request(pr_id)
            .await?
            .ok_or_else(|| AppError::not_found_with_id("PullRequest", pr_id))?;

        if pr.is_merged() {
            log::debug!("[reviewers] Pull request {} already merged", pr_id);
            return Ok(pr);
        }

        let merged = self
            .pull_requests
            .set_merged(pr_id, self.clock.unix_now())
            .await?
            .ok_or_else(|| AppError::not_found_with_id("PullRequest", pr_id))?;

        log::info!("[reviewers] Merged pull request {}", pr_id);
        Ok(merged)
    }

    /// Replace `old_reviewer_id` with an active teammate of theirs who is
    /// neither the author nor already reviewing. The replacement takes the
    /// old reviewer's position.
    pub async fn reassign(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
    ) -> Result<Reassignment, AppError> {
        require("pull_request_id", pr_id)?;
        require("old_reviewer_id", old_reviewer_id)?;

        let pr = self
            .pull_requests
            .get_pull_request(pr_id)
            .await?
            .ok_or_else(|| AppError::not_found_with_id("PullRequest", pr_id))?;

        pr.ensure_open()?;

        if !pr.has_reviewer(old_reviewer_id) {
            return Err(AppError::not_assigned(pr_id, old_reviewer_id));
        }

        let old_reviewer = self
            .users
            .get_user(old_reviewer_id)
            .await?
            .ok_or_else(|| AppError::not_found_with_id("User", old_reviewer_id))?;

        let roster = self.users.list_by_team(&old_reviewer.team_name).await?;

        let mut exclude: HashSet<&str> =
            pr.assigned_reviewers.iter().map(String::as_str).collect();
        exclude.insert(old_reviewer_id);
        let candidates = filter_candidates(&pr.author_id, &exclude, &roster);

        let replacement = self
            .selector
            .select(&candidates, 1)
            .into_iter()
            .next()
            .ok_or_else(|| AppError::no_candidate(pr_id))?;

        // The store swaps the single slot only if the old reviewer is still
        // assigned and the replacement is still eligible at write time.
        let updated = self
            .pull_requests
            .replace_reviewer(pr_id, old_reviewer_id, &replacement)
            .await?
            .ok_or_else(|| AppError::not_found_with_id("PullRequest", pr_id))?;

        log::info!(
            "[reviewers] Reassigned {} on pull request {} to {}",
            old_reviewer_id,
            pr_id,
            replacement
        );
        Ok(Reassignment {
            pull_request: updated,
            replaced_by: replacement,
        })
    }

    /// Deactivate every active member of a team and repair the reviewer
    /// sets of the open pull requests they were reviewing.
    pub async fn deactivate_team(&self, team_name: &str) -> Result<TeamDeactivation, AppError> {
        require("team_name", team_name)?;
        self.pull_requests
            .deactivate_team_and_reassign(team_name, self.clock.unix_now())
            .await
    }
}

pub(crate) fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::invalid_input_field(
            format!("{} is required", field),
            field,
        ));
    }
    Ok(())
}
