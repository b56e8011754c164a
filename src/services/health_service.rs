use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report `ok` or `degraded`, logging storage connectivity issues along the way.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_game_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    if state.is_degraded() {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::game_store::memory::MemoryGameStore,
        services::place_validator::fixed::StaticValidator, state::AppState,
    };

    #[tokio::test]
    async fn reports_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default(), Arc::new(StaticValidator::default()));
        assert_eq!(health_status(&state).await.status, "degraded");

        state
            .install_game_store(Arc::new(MemoryGameStore::new()))
            .await;
        assert_eq!(health_status(&state).await.status, "ok");

        state.clear_game_store().await;
        assert_eq!(health_status(&state).await.status, "degraded");
    }
}
