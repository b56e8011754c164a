use std::time::SystemTime;

use tracing::{info, warn};

use crate::{
    dao::models::ScoreEntity,
    dto::leaderboard::{LeaderboardEntry, RecordScoreRequest},
    error::ServiceError,
    services::sse_events,
    state::SharedState,
};

/// Upsert `player`'s score (last write wins) and notify public subscribers.
pub async fn record_score(
    state: &SharedState,
    player: &str,
    score: u32,
) -> Result<(), ServiceError> {
    let name = player.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("player must not be blank".into()));
    }

    let store = state.require_game_store().await?;
    let entity = ScoreEntity {
        name: name.to_owned(),
        score,
        country: state.config().default_country().to_owned(),
        created_at: SystemTime::now(),
    };
    store.upsert_score(entity).await?;

    info!(player = %name, score, "score recorded");
    sse_events::broadcast_leaderboard_updated(state, name, score);
    Ok(())
}

/// Record a score submitted directly by a client.
pub async fn record_score_request(
    state: &SharedState,
    request: RecordScoreRequest,
) -> Result<(), ServiceError> {
    record_score(state, &request.player, request.score).await
}

/// Best scores, ranked from 1. Storage problems yield an empty board.
pub async fn leaderboard(state: &SharedState) -> Vec<LeaderboardEntry> {
    let store = match state.require_game_store().await {
        Ok(store) => store,
        Err(err) => {
            warn!(error = %err, "leaderboard requested without storage");
            return Vec::new();
        }
    };

    match store.top_scores(state.config().leaderboard_size()).await {
        Ok(scores) => scores
            .into_iter()
            .enumerate()
            .map(|(index, entity)| LeaderboardEntry::ranked(index + 1, entity))
            .collect(),
        Err(err) => {
            warn!(error = %err, "failed to load leaderboard");
            Vec::new()
        }
    }
}
