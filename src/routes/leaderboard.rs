use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::leaderboard::{LeaderboardEntry, RecordScoreRequest},
    error::AppError,
    services::leaderboard_service,
    state::SharedState,
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/leaderboard", get(leaderboard))
        .route("/scores", post(record_score))
}

/// Best scores; empty when storage is unavailable.
#[utoipa::path(
    get,
    path = "/leaderboard",
    tag = "leaderboard",
    responses((status = 200, description = "Top scores", body = [LeaderboardEntry]))
)]
pub async fn leaderboard(State(state): State<SharedState>) -> Json<Vec<LeaderboardEntry>> {
    Json(leaderboard_service::leaderboard(&state).await)
}

/// Record a score for a player, replacing any previous one.
#[utoipa::path(
    post,
    path = "/scores",
    tag = "leaderboard",
    request_body = RecordScoreRequest,
    responses(
        (status = 204, description = "Score stored"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn record_score(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RecordScoreRequest>>,
) -> Result<StatusCode, AppError> {
    leaderboard_service::record_score_request(&state, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}
