//! SQLite-backed store and the query helpers shared by its trait impls.

use crate::db::pool::DbPool;
use crate::error::{store_err, AppError};
use crate::models::User;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;

/// Store implementation over a pooled SQLite connection.
///
/// Implements [`crate::store::UserStore`], [`crate::store::TeamStore`] and
/// [`crate::store::PullRequestStore`]; see the sibling modules.
#[derive(Clone)]
pub struct SqliteStore {
    pub(crate) pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Whether a sqlx error is a primary key / unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Append `(?, ?, ...)` with one bound parameter per id.
pub(crate) fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[String]) {
    qb.push("(");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(id.clone());
    }
    separated.push_unseparated(")");
}

/// Load users by id set. Unknown ids are skipped; result ordered by id.
pub(crate) async fn fetch_users_by_ids(
    conn: &mut SqliteConnection,
    user_ids: &[String],
) -> Result<Vec<User>, AppError> {
    if user_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT id, username, team_name, is_active FROM users WHERE id IN ",
    );
    push_id_list(&mut qb, user_ids);
    qb.push(" ORDER BY id");

    qb.build_query_as::<User>()
        .fetch_all(&mut *conn)
        .await
        .map_err(store_err("load users by id"))
}

/// Reviewer ids of one pull request, in assignment order.
pub(crate) async fn fetch_reviewers(
    conn: &mut SqliteConnection,
    pr_id: &str,
) -> Result<Vec<String>, AppError> {
    sqlx::query_scalar(
        "SELECT reviewer_id FROM pull_request_reviewers WHERE pr_id = ? ORDER BY position",
    )
    .bind(pr_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(store_err("load reviewers"))
}

/// Reviewer ids of many pull requests, keyed by pull request id.
pub(crate) async fn fetch_reviewers_for(
    conn: &mut SqliteConnection,
    pr_ids: &[String],
) -> Result<HashMap<String, Vec<String>>, AppError> {
    let mut by_pr: HashMap<String, Vec<String>> = HashMap::new();
    if pr_ids.is_empty() {
        return Ok(by_pr);
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT pr_id, reviewer_id FROM pull_request_reviewers WHERE pr_id IN ",
    );
    push_id_list(&mut qb, pr_ids);
    qb.push(" ORDER BY pr_id, position");

    let rows: Vec<(String, String)> = qb
        .build_query_as()
        .fetch_all(&mut *conn)
        .await
        .map_err(store_err("load current reviewers"))?;

    // Rows arrive grouped by pull request, already in position order
    for (pr_id, reviewer_id) in rows {
        by_pr.entry(pr_id).or_default().push(reviewer_id);
    }
    Ok(by_pr)
}

/// Replace a pull request's reviewer rows with `reviewer_ids`, in order.
pub(crate) async fn write_reviewers(
    conn: &mut SqliteConnection,
    pr_id: &str,
    reviewer_ids: &[String],
) -> Result<(), AppError> {
    // Positions restart at zero, so clear the old rows first
    sqlx::query("DELETE FROM pull_request_reviewers WHERE pr_id = ?")
        .bind(pr_id)
        .execute(&mut *conn)
        .await
        .map_err(store_err("delete old reviewers"))?;

    insert_reviewers(conn, pr_id, reviewer_ids).await
}

pub(crate) async fn insert_reviewers(
    conn: &mut SqliteConnection,
    pr_id: &str,
    reviewer_ids: &[String],
) -> Result<(), AppError> {
    for (position, reviewer_id) in reviewer_ids.iter().enumerate() {
        sqlx::query(
            "INSERT INTO pull_request_reviewers (pr_id, reviewer_id, position) VALUES (?, ?, ?)",
        )
        .bind(pr_id)
        .bind(reviewer_id)
        .bind(position as i64)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            AppError::database_with_op(
                e.to_string(),
                format!("insert reviewer {} for pull request {}", reviewer_id, pr_id),
            )
        })?;
    }
    Ok(())
}
