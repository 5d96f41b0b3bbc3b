//! Data models for the application.
//!
//! These models represent the core entities stored in the local SQLite database
//! and returned from the HTTP API.

pub mod pull_request;
pub mod stats;
pub mod team;
pub mod user;

// Re-exports for convenient access
pub use pull_request::{
    PullRequest, PullRequestRow, PullRequestShort, PullRequestStatus, REVIEWER_CAP,
};
pub use stats::{AssignmentStats, PullRequestAssignmentCount, UserAssignmentCount};
pub use team::{Team, TeamDeactivation};
pub use user::{TeamMember, User};
