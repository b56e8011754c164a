pub mod letters;
pub mod round;
mod session;
mod sse;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig, dao::game_store::GameStore, error::ServiceError,
    services::place_validator::PlaceValidator,
};

pub use self::session::RoundSession;
pub use self::sse::SseHub;

pub type SharedState = Arc<AppState>;

const PUBLIC_EVENT_CAPACITY: usize = 16;

/// Central application state: live round sessions, the installed store and the place oracle.
pub struct AppState {
    config: AppConfig,
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    validator: Arc<dyn PlaceValidator>,
    sessions: DashMap<Uuid, Arc<RoundSession>>,
    public_sse: SseHub,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, validator: Arc<dyn PlaceValidator>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            game_store: RwLock::new(None),
            validator,
            sessions: DashMap::new(),
            public_sse: SseHub::new(PUBLIC_EVENT_CAPACITY),
            degraded: degraded_tx,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Oracle consulted for places the store does not know yet.
    pub fn validator(&self) -> &Arc<dyn PlaceValidator> {
        &self.validator
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Game store or [`ServiceError::Degraded`] when none is installed.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn install_game_store(&self, store: Arc<dyn GameStore>) -> bool {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false)
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) -> bool {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.update_degraded(true)
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Set the degraded flag, returning whether it changed.
    pub fn update_degraded(&self, value: bool) -> bool {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        })
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.public_sse
    }

    /// Register a freshly created session.
    pub fn insert_session(&self, session: Arc<RoundSession>) {
        self.sessions.insert(session.id(), session);
    }

    pub fn session(&self, id: Uuid) -> Option<Arc<RoundSession>> {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }

    /// Drop a session from the registry, returning it when it was present.
    pub fn remove_session(&self, id: Uuid) -> Option<Arc<RoundSession>> {
        self.sessions.remove(&id).map(|(_, session)| session)
    }

    /// Number of sessions currently registered, finished ones included.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
