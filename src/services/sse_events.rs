use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        round::RoundSnapshot,
        sse::{
            LeaderboardUpdatedEvent, PlaceAcceptedEvent, RoundOverEvent, ScoreSaveFailedEvent,
            ScoreSavedEvent, ServerEvent, SystemStatus, TickEvent,
        },
    },
    state::{RoundSession, SharedState, SseHub},
};

const EVENT_TICK: &str = "tick";
const EVENT_PLACE_ACCEPTED: &str = "place.accepted";
const EVENT_ROUND_OVER: &str = "round.over";
const EVENT_SCORE_SAVED: &str = "score.saved";
const EVENT_SCORE_SAVE_FAILED: &str = "score.save_failed";
const EVENT_SYSTEM_STATUS: &str = "system.status";
const EVENT_LEADERBOARD_UPDATED: &str = "leaderboard.updated";

/// Broadcast the remaining time of a running round.
pub fn broadcast_tick(session: &RoundSession, time_left: u32, time_limit: u32) {
    let payload = TickEvent {
        time_left,
        time_limit,
    };
    send_event(session.events(), EVENT_TICK, &payload);
}

/// Broadcast an accepted place with the round's new score and letter.
pub fn broadcast_place_accepted(session: &RoundSession, payload: PlaceAcceptedEvent) {
    send_event(session.events(), EVENT_PLACE_ACCEPTED, &payload);
}

/// Broadcast the final snapshot of a round.
pub fn broadcast_round_over(session: &RoundSession, snapshot: RoundSnapshot) {
    send_event(session.events(), EVENT_ROUND_OVER, &RoundOverEvent(snapshot));
}

/// Tell the round's listeners its final score was stored.
pub fn broadcast_score_saved(session: &RoundSession, score: u32) {
    let payload = ScoreSavedEvent {
        player: session.player().to_owned(),
        score,
    };
    send_event(session.events(), EVENT_SCORE_SAVED, &payload);
}

/// Tell the round's listeners its final score could not be stored.
pub fn broadcast_score_save_failed(session: &RoundSession, score: u32, message: String) {
    let payload = ScoreSaveFailedEvent {
        player: session.player().to_owned(),
        score,
        message,
    };
    send_event(session.events(), EVENT_SCORE_SAVE_FAILED, &payload);
}

/// Broadcast the current degraded flag on the public stream.
pub fn broadcast_system_status(state: &SharedState) {
    let payload = SystemStatus {
        degraded: state.is_degraded(),
    };
    send_event(state.public_sse(), EVENT_SYSTEM_STATUS, &payload);
}

/// Tell public subscribers a score was stored.
pub fn broadcast_leaderboard_updated(state: &SharedState, player: &str, score: u32) {
    let payload = LeaderboardUpdatedEvent {
        player: player.to_owned(),
        score,
    };
    send_event(state.public_sse(), EVENT_LEADERBOARD_UPDATED, &payload);
}

fn send_event(hub: &SseHub, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => hub.broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
