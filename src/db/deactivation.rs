//! Team deactivation with cascading reviewer reassignment.
//!
//! Everything below runs in one transaction: the member deactivation, the
//! snapshot of affected pull requests and every reviewer-set rewrite. Any
//! error drops the transaction, which rolls all of it back.

use crate::db::pool::DbPool;
use crate::db::store::{fetch_reviewers_for, fetch_users_by_ids, push_id_list, write_reviewers};
use crate::error::{store_err, AppError};
use crate::models::{TeamDeactivation, REVIEWER_CAP};
use crate::services::reassignment::{plan_reassignments, AffectedPullRequest};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::{BTreeSet, HashMap, HashSet};

pub async fn deactivate_team_and_reassign(
    pool: &DbPool,
    team_name: &str,
    now: i64,
) -> Result<TeamDeactivation, AppError> {
    let mut result = TeamDeactivation {
        team_name: team_name.to_string(),
        ..Default::default()
    };

    let mut tx = pool
        .begin()
        .await
        .map_err(store_err("begin deactivate team"))?;

    // Write first so the transaction holds the database write lock before
    // it reads the snapshot it will act on.
    let deactivated = deactivate_members(&mut tx, team_name, now).await?;

    if !team_exists(&mut tx, team_name).await? {
        return Err(AppError::not_found_with_id("Team", team_name));
    }

    result.deactivated_users = deactivated.len();
    if deactivated.is_empty() {
        tx.commit()
            .await
            .map_err(store_err("commit empty deactivation"))?;
        log::info!("[reviewers] Team {} had no active members", team_name);
        return Ok(result);
    }

    let affected = load_affected_pull_requests(&mut tx, &deactivated).await?;
    if affected.is_empty() {
        tx.commit()
            .await
            .map_err(store_err("commit deactivation without pull request updates"))?;
        log::info!(
            "[reviewers] Deactivated {} members of team {}, no open pull requests affected",
            result.deactivated_users,
            team_name
        );
        return Ok(result);
    }

    let team_names: Vec<String> = affected
        .iter()
        .filter_map(|pr| pr.author_team.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let candidates_by_team = load_active_candidates(&mut tx, &team_names).await?;

    let deactivated_set: HashSet<String> = deactivated.into_iter().collect();
    let plan = plan_reassignments(&affected, &deactivated_set, &candidates_by_team);

    for update in &plan {
        write_reviewers(&mut tx, &update.pr_id, &update.reviewers).await?;
        if update.reviewers.len() < REVIEWER_CAP {
            log::warn!(
                "[reviewers] Pull request {} left with {} reviewer(s) after deactivating team {}",
                update.pr_id,
                update.reviewers.len(),
                team_name
            );
        }
    }
    result.updated_pull_requests = plan.len();

    tx.commit()
        .await
        .map_err(store_err("commit deactivate team"))?;

    log::info!(
        "[reviewers] Deactivated {} members of team {}, reassigned {} pull requests",
        result.deactivated_users,
        team_name,
        result.updated_pull_requests
    );
    Ok(result)
}

async fn team_exists(conn: &mut SqliteConnection, team_name: &str) -> Result<bool, AppError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM teams WHERE name = ?")
        .bind(team_name)
        .fetch_optional(&mut *conn)
        .await
        .map_err(store_err("check team exists"))?;
    Ok(row.is_some())
}

/// Flip every active member of the team to inactive, returning their ids.
async fn deactivate_members(
    conn: &mut SqliteConnection,
    team_name: &str,
    now: i64,
) -> Result<Vec<String>, AppError> {
    sqlx::query_scalar(
        r#"
        UPDATE users
        SET is_active = 0, updated_at = ?
        WHERE team_name = ? AND is_active = 1
        RETURNING id
        "#,
    )
    .bind(now)
    .bind(team_name)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| {
        AppError::database_with_op(e.to_string(), format!("deactivate users of team {}", team_name))
    })
}

/// Open pull requests reviewed by any of `reviewer_ids`, with their full
/// reviewer sets and their authors' teams.
async fn load_affected_pull_requests(
    conn: &mut SqliteConnection,
    reviewer_ids: &[String],
) -> Result<Vec<AffectedPullRequest>, AppError> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        r#"
        SELECT DISTINCT p.id, p.author_id
        FROM pull_request_reviewers r
        JOIN pull_requests p ON p.id = r.pr_id
        WHERE p.status = 'OPEN' AND r.reviewer_id IN "#,
    );
    push_id_list(&mut qb, reviewer_ids);
    qb.push(" ORDER BY p.id");

    let rows: Vec<(String, String)> = qb
        .build_query_as()
        .fetch_all(&mut *conn)
        .await
        .map_err(store_err("select affected pull requests"))?;

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let pr_ids: Vec<String> = rows.iter().map(|(id, _)| id.clone()).collect();
    let mut reviewers_by_pr = fetch_reviewers_for(conn, &pr_ids).await?;

    let author_ids: Vec<String> = rows
        .iter()
        .map(|(_, author)| author.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let author_team: HashMap<String, String> = fetch_users_by_ids(conn, &author_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u.team_name))
        .collect();

    Ok(rows
        .into_iter()
        .map(|(pr_id, author_id)| AffectedPullRequest {
            current_reviewers: reviewers_by_pr.remove(&pr_id).unwrap_or_default(),
            author_team: author_team.get(&author_id).cloned(),
            pr_id,
            author_id,
        })
        .collect())
}

/// Active users per team, each list ordered by user id.
async fn load_active_candidates(
    conn: &mut SqliteConnection,
    team_names: &[String],
) -> Result<HashMap<String, Vec<String>>, AppError> {
    let mut by_team: HashMap<String, Vec<String>> = HashMap::new();
    if team_names.is_empty() {
        return Ok(by_team);
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT team_name, id FROM users WHERE is_active = 1 AND team_name IN ",
    );
    push_id_list(&mut qb, team_names);
    qb.push(" ORDER BY team_name, id");

    let rows: Vec<(String, String)> = qb
        .build_query_as()
        .fetch_all(&mut *conn)
        .await
        .map_err(store_err("load active candidates"))?;

    for (team, user_id) in rows {
        by_team.entry(team).or_default().push(user_id);
    }
    Ok(by_team)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::error::ErrorCode;
    use crate::models::{PullRequest, PullRequestStatus, User};
    use crate::store::{PullRequestStore, TeamStore, UserStore};
    use tempfile::tempdir;

    async fn setup_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempdir().unwrap();
        let pool = crate::db::initialize(&dir.path().join("test.db"), 2)
            .await
            .unwrap();
        (dir, SqliteStore::new(pool))
    }

    async fn add_team(store: &SqliteStore, team: &str, ids: &[&str]) {
        let members: Vec<User> = ids
            .iter()
            .map(|id| User {
                id: id.to_string(),
                username: id.to_uppercase(),
                team_name: team.into(),
                is_active: true,
            })
            .collect();
        store.create_team(team, &members, 1).await.unwrap();
    }

    async fn add_pr(store: &SqliteStore, id: &str, author: &str, reviewers: &[&str]) {
        store
            .create_with_reviewers(&PullRequest {
                id: id.into(),
                name: id.into(),
                author_id: author.into(),
                status: PullRequestStatus::Open,
                assigned_reviewers: reviewers.iter().map(|s| s.to_string()).collect(),
                created_at: 1,
                merged_at: None,
            })
            .await
            .unwrap();
    }

    async fn reviewers(store: &SqliteStore, pr_id: &str) -> Vec<String> {
        store
            .get_pull_request(pr_id)
            .await
            .unwrap()
            .unwrap()
            .assigned_reviewers
    }

    #[tokio::test]
    async fn test_unknown_team_is_not_found() {
        let (_dir, store) = setup_store().await;
        let err = deactivate_team_and_reassign(store.pool(), "ghosts", 5)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_cross_team_reviewers_are_replaced_from_author_team() {
        let (_dir, store) = setup_store().await;
        add_team(&store, "web", &["a", "b", "c"]).await;
        add_team(&store, "infra", &["x", "y"]).await;
        // Reviewer y comes from another team than the author
        add_pr(&store, "p1", "a", &["b", "y"]).await;

        let result = deactivate_team_and_reassign(store.pool(), "infra", 5)
            .await
            .unwrap();

        assert_eq!(result.deactivated_users, 2);
        assert_eq!(result.updated_pull_requests, 1);
        assert_eq!(reviewers(&store, "p1").await, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let (_dir, store) = setup_store().await;
        add_team(&store, "web", &["a", "b"]).await;

        let first = deactivate_team_and_reassign(store.pool(), "web", 5).await.unwrap();
        assert_eq!(first.deactivated_users, 2);

        let second = deactivate_team_and_reassign(store.pool(), "web", 6).await.unwrap();
        assert_eq!(second.deactivated_users, 0);
        assert_eq!(second.updated_pull_requests, 0);
    }

    #[tokio::test]
    async fn test_failure_rolls_back_everything() {
        let (_dir, store) = setup_store().await;
        add_team(&store, "web", &["a", "b", "c", "d"]).await;
        add_team(&store, "infra", &["x", "y"]).await;
        add_pr(&store, "p1", "a", &["b", "x"]).await;
        add_pr(&store, "p2", "a", &["c", "y"]).await;

        // Abort any reviewer rewrite on p2, after p1 has already been rewritten
        sqlx::query(
            "CREATE TRIGGER fail_p2 BEFORE INSERT ON pull_request_reviewers \
             WHEN NEW.pr_id = 'p2' BEGIN SELECT RAISE(ABORT, 'boom'); END",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let err = deactivate_team_and_reassign(store.pool(), "infra", 5)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StoreFailure);

        assert_eq!(reviewers(&store, "p1").await, vec!["b", "x"]);
        assert_eq!(reviewers(&store, "p2").await, vec!["c", "y"]);
        for id in ["x", "y"] {
            assert!(store.get_user(id).await.unwrap().unwrap().is_active);
        }
    }
}
