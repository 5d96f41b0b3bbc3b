//! JSON HTTP routes over the services.
//!
//! Every error leaves as `{"error": {"code": ..., "message": ...}}` with the
//! stable symbolic code from [`ErrorCode`].

use crate::error::{AppError, ErrorCode};
use crate::models::{PullRequest, PullRequestShort, Team, TeamDeactivation, User};
use crate::services::App;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

// ── Error handling ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorBody {
    code: ErrorCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// Wrapper to make AppError usable as an axum error response.
pub struct ApiErr(AppError);

impl ApiErr {
    fn status(&self) -> StatusCode {
        match self.0.code() {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::TeamExists | ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorCode::PrExists
            | ErrorCode::PrMerged
            | ErrorCode::NotAssigned
            | ErrorCode::NoCandidate => StatusCode::CONFLICT,
            ErrorCode::StoreFailure | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("[api] {}", self.0);
        }
        (
            status,
            Json(ErrorEnvelope {
                error: ErrorBody {
                    code: self.0.code(),
                    message: self.0.to_string(),
                },
            }),
        )
            .into_response()
    }
}

impl From<AppError> for ApiErr {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiErr {
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::invalid_input(format!(
            "invalid JSON body: {}",
            rejection.body_text()
        )))
    }
}

// ── Request types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TeamQuery {
    #[serde(default)]
    team_name: String,
}

#[derive(Deserialize)]
struct UserQuery {
    #[serde(default)]
    user_id: String,
}

#[derive(Deserialize)]
struct DeactivateTeamRequest {
    team_name: String,
}

#[derive(Deserialize)]
struct SetIsActiveRequest {
    user_id: String,
    is_active: bool,
}

#[derive(Deserialize)]
struct CreatePullRequestRequest {
    pull_request_id: String,
    pull_request_name: String,
    author_id: String,
}

#[derive(Deserialize)]
struct MergePullRequestRequest {
    pull_request_id: String,
}

#[derive(Deserialize)]
struct ReassignRequest {
    pull_request_id: String,
    old_reviewer_id: String,
}

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TeamResponse {
    team: Team,
}

#[derive(Serialize)]
struct UserResponse {
    user: User,
}

#[derive(Serialize)]
struct PullRequestResponse {
    pr: PullRequest,
}

#[derive(Serialize)]
struct UserReviewsResponse {
    user_id: String,
    pull_requests: Vec<PullRequestShort>,
}

// ── Route builder ────────────────────────────────────────────────────────────

/// Build the full API router with CORS applied.
pub fn routes(app: App) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/healthz", get(health))
        .route("/team/add", post(add_team))
        .route("/team/get", get(get_team))
        .route("/team/deactivate", post(deactivate_team))
        .route("/users/setIsActive", post(set_is_active))
        .route("/users/getReview", get(get_review))
        .route("/pullRequest/create", post(create_pull_request))
        .route("/pullRequest/merge", post(merge_pull_request))
        .route("/pullRequest/reassign", post(reassign_reviewer))
        .route("/stats/assignments", get(assignment_stats))
        .with_state(app)
        .layer(cors)
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /team/add
async fn add_team(
    State(app): State<App>,
    payload: Result<Json<Team>, JsonRejection>,
) -> Result<(StatusCode, Json<TeamResponse>), ApiErr> {
    let Json(team) = payload?;
    let team = app.teams.create_team(&team.team_name, team.members).await?;
    Ok((StatusCode::CREATED, Json(TeamResponse { team })))
}

/// GET /team/get?team_name=
async fn get_team(
    State(app): State<App>,
    Query(query): Query<TeamQuery>,
) -> Result<Json<Team>, ApiErr> {
    Ok(Json(app.teams.get_team(&query.team_name).await?))
}

/// POST /team/deactivate
async fn deactivate_team(
    State(app): State<App>,
    payload: Result<Json<DeactivateTeamRequest>, JsonRejection>,
) -> Result<Json<TeamDeactivation>, ApiErr> {
    let Json(req) = payload?;
    Ok(Json(app.pull_requests.deactivate_team(&req.team_name).await?))
}

/// POST /users/setIsActive
async fn set_is_active(
    State(app): State<App>,
    payload: Result<Json<SetIsActiveRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiErr> {
    let Json(req) = payload?;
    let user = app.users.set_active(&req.user_id, req.is_active).await?;
    Ok(Json(UserResponse { user }))
}

/// GET /users/getReview?user_id=
async fn get_review(
    State(app): State<App>,
    Query(query): Query<UserQuery>,
) -> Result<Json<UserReviewsResponse>, ApiErr> {
    let pull_requests = app.users.list_assigned_pull_requests(&query.user_id).await?;
    Ok(Json(UserReviewsResponse {
        user_id: query.user_id,
        pull_requests,
    }))
}

/// POST /pullRequest/create
async fn create_pull_request(
    State(app): State<App>,
    payload: Result<Json<CreatePullRequestRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PullRequestResponse>), ApiErr> {
    let Json(req) = payload?;
    let pr = app
        .pull_requests
        .create(&req.pull_request_id, &req.pull_request_name, &req.author_id)
        .await?;
    Ok((StatusCode::CREATED, Json(PullRequestResponse { pr })))
}

/// POST /pullRequest/merge
async fn merge_pull_request(
    State(app): State<App>,
    payload: Result<Json<MergePullRequestRequest>, JsonRejection>,
) -> Result<Json<PullRequestResponse>, ApiErr> {
    let Json(req) = payload?;
    let pr = app.pull_requests.merge(&req.pull_request_id).await?;
    Ok(Json(PullRequestResponse { pr }))
}

/// POST /pullRequest/reassign
async fn reassign_reviewer(
    State(app): State<App>,
    payload: Result<Json<ReassignRequest>, JsonRejection>,
) -> Result<Json<crate::services::Reassignment>, ApiErr> {
    let Json(req) = payload?;
    let result = app
        .pull_requests
        .reassign(&req.pull_request_id, &req.old_reviewer_id)
        .await?;
    Ok(Json(result))
}

/// GET /stats/assignments
async fn assignment_stats(
    State(app): State<App>,
) -> Result<Json<crate::models::AssignmentStats>, ApiErr> {
    Ok(Json(app.stats.assignment_stats().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let status = |e: AppError| ApiErr::from(e).status();
        assert_eq!(status(AppError::not_found("Team")), StatusCode::NOT_FOUND);
        assert_eq!(status(AppError::team_exists("t")), StatusCode::BAD_REQUEST);
        assert_eq!(status(AppError::pr_exists("p")), StatusCode::CONFLICT);
        assert_eq!(status(AppError::pr_merged("p")), StatusCode::CONFLICT);
        assert_eq!(status(AppError::no_candidate("p")), StatusCode::CONFLICT);
        assert_eq!(status(AppError::not_assigned("p", "u")), StatusCode::CONFLICT);
        assert_eq!(status(AppError::invalid_input("x")), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(AppError::database("locked")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
