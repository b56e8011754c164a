use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::round::RoundSnapshot;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Plain-text event.
    pub fn new<E>(event: E, data: String) -> Self
    where
        E: Into<Option<String>>,
    {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Sent every second while a round is active.
pub struct TickEvent {
    pub time_left: u32,
    pub time_limit: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// Sent when the validator accepted a place.
pub struct PlaceAcceptedEvent {
    pub place: String,
    pub score: u32,
    pub next_letter: String,
    pub time_limit: u32,
    pub time_limit_reduced: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Final snapshot sent when a round ends.
pub struct RoundOverEvent(pub RoundSnapshot);

#[derive(Debug, Serialize, ToSchema)]
/// Sent once a finished round's score has been stored.
pub struct ScoreSavedEvent {
    pub player: String,
    pub score: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// Sent when storing a finished round's score failed; the round result stands.
pub struct ScoreSaveFailedEvent {
    pub player: String,
    pub score: u32,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Public notification that the leaderboard may have changed.
pub struct LeaderboardUpdatedEvent {
    pub player: String,
    pub score: u32,
}
