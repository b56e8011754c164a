use serde::Serialize;
use utoipa::ToSchema;

use crate::state::round::RoundPhase;

/// Publicly visible round phase exposed to clients (REST/SSE).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleRoundPhase {
    /// Round created, no letter drawn yet.
    Idle,
    /// Countdown running.
    Active,
    /// Round finished.
    GameOver,
}

impl From<&RoundPhase> for VisibleRoundPhase {
    fn from(value: &RoundPhase) -> Self {
        match value {
            RoundPhase::Idle => VisibleRoundPhase::Idle,
            RoundPhase::Active => VisibleRoundPhase::Active,
            RoundPhase::GameOver(_) => VisibleRoundPhase::GameOver,
        }
    }
}
