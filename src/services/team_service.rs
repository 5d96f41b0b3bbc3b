//! Team creation and lookup.

use crate::error::AppError;
use crate::models::{Team, TeamMember, User};
use crate::services::clock::Clock;
use crate::services::pr_service::require;
use crate::store::TeamStore;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct TeamService {
    teams: Arc<dyn TeamStore>,
    clock: Arc<dyn Clock>,
}

impl TeamService {
    pub fn new(teams: Arc<dyn TeamStore>, clock: Arc<dyn Clock>) -> Self {
        Self { teams, clock }
    }

    /// Create a team and upsert its members.
    ///
    /// Members that already exist in another team are moved into this one.
    pub async fn create_team(
        &self,
        team_name: &str,
        members: Vec<TeamMember>,
    ) -> Result<Team, AppError> {
        require("team_name", team_name)?;

        let mut seen = HashSet::new();
        for member in &members {
            require("user_id", &member.user_id)?;
            if !seen.insert(member.user_id.as_str()) {
                return Err(AppError::invalid_input_field(
                    format!("duplicate member {}", member.user_id),
                    "members",
                ));
            }
        }

        if self.teams.team_exists(team_name).await? {
            return Err(AppError::team_exists(team_name));
        }

        let users: Vec<User> = members
            .into_iter()
            .map(|m| m.into_user(team_name))
            .collect();
        self.teams
            .create_team(team_name, &users, self.clock.unix_now())
            .await?;

        log::info!(
            "[teams] Created team {} with {} members",
            team_name,
            users.len()
        );
        Ok(Team::new(team_name, &users))
    }

    pub async fn get_team(&self, team_name: &str) -> Result<Team, AppError> {
        require("team_name", team_name)?;
        self.teams
            .get_team(team_name)
            .await?
            .ok_or_else(|| AppError::not_found_with_id("Team", team_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::error::ErrorCode;
    use crate::services::clock::FixedClock;
    use tempfile::tempdir;

    async fn setup() -> (tempfile::TempDir, TeamService) {
        let dir = tempdir().unwrap();
        let pool = crate::db::initialize(&dir.path().join("test.db"), 2)
            .await
            .unwrap();
        let service = TeamService::new(
            Arc::new(SqliteStore::new(pool)),
            Arc::new(FixedClock::at_unix(50)),
        );
        (dir, service)
    }

    fn member(id: &str, active: bool) -> TeamMember {
        TeamMember {
            user_id: id.into(),
            username: id.to_uppercase(),
            is_active: active,
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let (_dir, service) = setup().await;

        let created = service
            .create_team("backend", vec![member("u2", false), member("u1", true)])
            .await
            .unwrap();
        assert_eq!(created.members.len(), 2);

        let fetched = service.get_team("backend").await.unwrap();
        let ids: Vec<&str> = fetched.members.iter().map(|m| m.user_id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2"]);
        assert!(!fetched.members[1].is_active);
    }

    #[tokio::test]
    async fn test_duplicate_team() {
        let (_dir, service) = setup().await;
        service.create_team("backend", vec![]).await.unwrap();

        let err = service.create_team("backend", vec![]).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::TeamExists);
    }

    #[tokio::test]
    async fn test_invalid_members_rejected() {
        let (_dir, service) = setup().await;

        let err = service
            .create_team("backend", vec![member("u1", true), member("u1", false)])
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);

        let err = service.create_team("", vec![]).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);

        // Nothing was written by the rejected calls
        let err = service.get_team("backend").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
