use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{dao::models::ScoreEntity, dto::validation::validate_player_name};

/// Flag shown when a stored score carries no country.
pub const FALLBACK_COUNTRY: &str = "🏳️";
const AVATAR_BASE_URL: &str = "https://placehold.co/40x40?text=";

/// One row of the leaderboard.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// 1-based position.
    pub rank: usize,
    /// Player name.
    pub name: String,
    /// Best recorded score.
    pub score: u32,
    /// Country flag emoji.
    pub country: String,
    /// Placeholder image derived from the first character of the name.
    pub avatar: String,
}

impl LeaderboardEntry {
    /// Build the entry shown at `rank` for a stored score.
    pub fn ranked(rank: usize, entity: ScoreEntity) -> Self {
        let country = if entity.country.trim().is_empty() {
            FALLBACK_COUNTRY.to_owned()
        } else {
            entity.country
        };
        let initial = entity
            .name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect::<String>())
            .unwrap_or_default();

        Self {
            rank,
            avatar: format!("{AVATAR_BASE_URL}{initial}"),
            name: entity.name,
            score: entity.score,
            country,
        }
    }
}

/// Record a score outside of a round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RecordScoreRequest {
    #[validate(custom(function = "validate_player_name"))]
    pub player: String,
    pub score: u32,
}
