use std::{sync::OnceLock, time::SystemTime};

use tokio::{sync::Mutex, task::AbortHandle};
use uuid::Uuid;

use crate::{
    services::place_validator::PlaceCategory,
    state::{
        SseHub,
        round::{RoundRules, RoundState},
    },
};

const SESSION_EVENT_CAPACITY: usize = 32;

/// One player's round together with its event stream and countdown task.
pub struct RoundSession {
    id: Uuid,
    player: String,
    category: PlaceCategory,
    started_at: SystemTime,
    round: Mutex<RoundState>,
    events: SseHub,
    ticker: OnceLock<AbortHandle>,
}

impl RoundSession {
    /// Create an idle session; the round service draws the letter and starts the countdown.
    pub fn new(player: String, category: PlaceCategory, rules: RoundRules) -> Self {
        Self {
            id: Uuid::new_v4(),
            player,
            category,
            started_at: SystemTime::now(),
            round: Mutex::new(RoundState::new(rules)),
            events: SseHub::new(SESSION_EVENT_CAPACITY),
            ticker: OnceLock::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    pub fn category(&self) -> PlaceCategory {
        self.category
    }

    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Round state; never hold the guard across a validator or storage call.
    pub fn round(&self) -> &Mutex<RoundState> {
        &self.round
    }

    /// Per-session event hub.
    pub fn events(&self) -> &SseHub {
        &self.events
    }

    /// Remember the countdown task so it can be stopped with the session.
    pub fn attach_ticker(&self, handle: AbortHandle) {
        if let Err(handle) = self.ticker.set(handle) {
            handle.abort();
        }
    }

    /// Stop the countdown task, if any.
    pub fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.get() {
            handle.abort();
        }
    }
}

impl Drop for RoundSession {
    fn drop(&mut self) {
        self.cancel_ticker();
    }
}
