use axum::{Json, Router, extract::State, routing::post};
use axum_valid::Valid;

use crate::{
    dto::place::{ValidatePlaceRequest, ValidatePlaceResponse},
    error::AppError,
    services::place_service,
    state::SharedState,
};

pub fn router() -> Router<SharedState> {
    Router::new().route("/places/validate", post(validate_place))
}

/// Ask whether a place exists, optionally within a category.
#[utoipa::path(
    post,
    path = "/places/validate",
    tag = "places",
    request_body = ValidatePlaceRequest,
    responses(
        (status = 200, description = "Verdict", body = ValidatePlaceResponse),
        (status = 502, description = "Validator answer could not be read"),
        (status = 503, description = "Validator unreachable")
    )
)]
pub async fn validate_place(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<ValidatePlaceRequest>>,
) -> Result<Json<ValidatePlaceResponse>, AppError> {
    Ok(Json(place_service::check_place(&state, payload).await?))
}
