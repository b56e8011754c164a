/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Leaderboard reads and score persistence.
pub mod leaderboard_service;
/// Known-place cache in front of the place validator.
pub mod place_service;
/// Place-name oracles.
pub mod place_validator;
/// Round lifecycle, countdown and submissions.
pub mod round_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervisor with degraded-mode fallback.
pub mod storage_supervisor;
