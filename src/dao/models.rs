use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Best score recorded for a player, keyed by the player name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntity {
    /// Player name, also the record key.
    pub name: String,
    /// Last submitted score (last write wins).
    pub score: u32,
    /// Flag emoji shown next to the player on the leaderboard.
    pub country: String,
    /// When the record was last written.
    pub created_at: SystemTime,
}

/// Place name confirmed as real by the oracle, cached to spare later lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaceEntity {
    /// Lowercased place name, also the record key.
    pub name: String,
    /// When the place was first confirmed.
    pub recorded_at: SystemTime,
}

impl PlaceEntity {
    /// Build a place record keyed by the lowercased `name`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            recorded_at: SystemTime::now(),
        }
    }
}

/// Order scores for the leaderboard: best first, ties broken by name for stable output.
pub fn rank_scores(mut scores: Vec<ScoreEntity>, limit: usize) -> Vec<ScoreEntity> {
    scores.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    scores.truncate(limit);
    scores
}
