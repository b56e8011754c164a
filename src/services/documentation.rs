use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Place Chain Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::round::start_round,
        crate::routes::round::get_round,
        crate::routes::round::submit_place,
        crate::routes::round::abandon_round,
        crate::routes::round::round_events,
        crate::routes::place::validate_place,
        crate::routes::leaderboard::leaderboard,
        crate::routes::leaderboard::record_score,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::phase::VisibleRoundPhase,
            crate::dto::round::GameOverDetails,
            crate::dto::round::GameOverKind,
            crate::dto::round::RejectionKind,
            crate::dto::round::SubmissionOutcome,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::TickEvent,
            crate::dto::sse::PlaceAcceptedEvent,
            crate::dto::sse::ScoreSavedEvent,
            crate::dto::sse::ScoreSaveFailedEvent,
            crate::dto::sse::LeaderboardUpdatedEvent,
            crate::services::place_validator::PlaceCategory,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rounds", description = "Round lifecycle and place submissions"),
        (name = "places", description = "Direct place validation"),
        (name = "leaderboard", description = "Scores and leaderboard"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
