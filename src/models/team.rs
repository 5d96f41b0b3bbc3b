//! Team model.

use serde::{Deserialize, Serialize};

use super::user::{TeamMember, User};

/// A named group of users. Teams are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub team_name: String,
    #[serde(default)]
    pub members: Vec<TeamMember>,
}

impl Team {
    pub fn new(team_name: impl Into<String>, members: &[User]) -> Self {
        Self {
            team_name: team_name.into(),
            members: members.iter().map(TeamMember::from).collect(),
        }
    }
}

/// Outcome of deactivating a whole team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeamDeactivation {
    pub team_name: String,

    /// Users whose active flag was flipped by this run.
    pub deactivated_users: usize,

    /// Open pull requests that had a deactivated reviewer, whether or not
    /// their recomputed reviewer set differs from the old one.
    pub updated_pull_requests: usize,
}
