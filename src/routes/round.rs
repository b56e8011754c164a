use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    routing::{get, post},
};
use axum_valid::Valid;
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::round::{RoundSnapshot, StartRoundRequest, SubmissionResponse, SubmitPlaceRequest},
    error::AppError,
    services::{
        round_service,
        sse_service::{self, StreamKind},
    },
    state::SharedState,
};

/// Routes driving a single-player round.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rounds", post(start_round))
        .route("/rounds/{id}", get(get_round).delete(abandon_round))
        .route("/rounds/{id}/submissions", post(submit_place))
        .route("/rounds/{id}/events", get(round_events))
}

/// Start a new round with a random first letter.
#[utoipa::path(
    post,
    path = "/rounds",
    tag = "rounds",
    request_body = StartRoundRequest,
    responses(
        (status = 200, description = "Round started", body = RoundSnapshot),
        (status = 400, description = "Invalid player name")
    )
)]
pub async fn start_round(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<StartRoundRequest>>,
) -> Result<Json<RoundSnapshot>, AppError> {
    Ok(Json(round_service::start_round(&state, payload).await?))
}

#[utoipa::path(
    get,
    path = "/rounds/{id}",
    tag = "rounds",
    params(("id" = Uuid, Path, description = "Round identifier")),
    responses(
        (status = 200, description = "Current round state", body = RoundSnapshot),
        (status = 404, description = "Unknown round")
    )
)]
pub async fn get_round(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoundSnapshot>, AppError> {
    Ok(Json(round_service::get_round(&state, id).await?))
}

/// Submit a place for the current letter; rule violations are reported in the outcome.
#[utoipa::path(
    post,
    path = "/rounds/{id}/submissions",
    tag = "rounds",
    params(("id" = Uuid, Path, description = "Round identifier")),
    request_body = SubmitPlaceRequest,
    responses(
        (status = 200, description = "Submission outcome", body = SubmissionResponse),
        (status = 404, description = "Unknown round")
    )
)]
pub async fn submit_place(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SubmitPlaceRequest>>,
) -> Result<Json<SubmissionResponse>, AppError> {
    Ok(Json(round_service::submit_place(&state, id, payload).await?))
}

/// Abandon a round and stop its countdown.
#[utoipa::path(
    delete,
    path = "/rounds/{id}",
    tag = "rounds",
    params(("id" = Uuid, Path, description = "Round identifier")),
    responses(
        (status = 204, description = "Round dropped"),
        (status = 404, description = "Unknown round")
    )
)]
pub async fn abandon_round(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    round_service::abandon_round(&state, id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stream countdown ticks and round events.
#[utoipa::path(
    get,
    path = "/rounds/{id}/events",
    tag = "sse",
    params(("id" = Uuid, Path, description = "Round identifier")),
    responses(
        (status = 200, description = "Round SSE stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown round")
    )
)]
pub async fn round_events(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let receiver = sse_service::subscribe_round(&state, id)?;
    info!(round_id = %id, "New round SSE connection");
    Ok(sse_service::to_sse_stream(receiver, StreamKind::Round(id)))
}
