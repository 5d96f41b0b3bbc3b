//! Reviewer recomputation for team deactivation.
//!
//! The store loads a snapshot of every affected pull request inside the
//! deactivation transaction and hands it to [`plan_reassignments`]; the
//! returned updates are written back in that same transaction.

use crate::models::REVIEWER_CAP;
use std::collections::{HashMap, HashSet};

/// An open pull request with at least one reviewer being deactivated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffectedPullRequest {
    pub pr_id: String,
    pub author_id: String,
    /// Full reviewer set before this run, in assignment order.
    pub current_reviewers: Vec<String>,
    /// `None` if the author row could not be resolved.
    pub author_team: Option<String>,
}

/// Replacement reviewer set for one pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewerUpdate {
    pub pr_id: String,
    pub reviewers: Vec<String>,
}

/// Recompute reviewer sets for every affected pull request.
///
/// `candidates_by_team` holds the active users of each author team, read
/// after the deactivation so just-deactivated users are already gone. For
/// each pull request the surviving reviewers keep their order, then
/// candidates are appended in pool order until the cap is reached. A
/// result with fewer than two reviewers is accepted.
///
/// Exactly one update is produced per affected pull request, even when the
/// new set equals the old one.
pub fn plan_reassignments(
    affected: &[AffectedPullRequest],
    deactivated: &HashSet<String>,
    candidates_by_team: &HashMap<String, Vec<String>>,
) -> Vec<ReviewerUpdate> {
    affected
        .iter()
        .map(|pr| ReviewerUpdate {
            pr_id: pr.pr_id.clone(),
            reviewers: recompute_reviewers(pr, deactivated, candidates_by_team),
        })
        .collect()
}

fn recompute_reviewers(
    pr: &AffectedPullRequest,
    deactivated: &HashSet<String>,
    candidates_by_team: &HashMap<String, Vec<String>>,
) -> Vec<String> {
    let mut present: HashSet<&str> = HashSet::new();
    let mut reviewers: Vec<String> = Vec::with_capacity(REVIEWER_CAP);

    for id in &pr.current_reviewers {
        if deactivated.contains(id) || !present.insert(id.as_str()) {
            continue;
        }
        reviewers.push(id.clone());
    }

    let pool = pr
        .author_team
        .as_ref()
        .and_then(|team| candidates_by_team.get(team))
        .map(Vec::as_slice)
        .unwrap_or_default();

    for candidate in pool {
        if reviewers.len() >= REVIEWER_CAP {
            break;
        }
        if *candidate == pr.author_id || present.contains(candidate.as_str()) {
            continue;
        }
        present.insert(candidate.as_str());
        reviewers.push(candidate.clone());
    }

    reviewers
}
