use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{format_system_time, phase::VisibleRoundPhase, validation::validate_player_name},
    services::place_validator::PlaceCategory,
    state::{
        RoundSession,
        round::{GameOverReason, RejectReason, RoundPhase, RoundState},
    },
};

/// Payload used to start a new round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct StartRoundRequest {
    /// Name the score is recorded under.
    #[validate(custom(function = "validate_player_name"))]
    pub player: String,
    /// Restricts which places the validator accepts.
    #[serde(default)]
    pub category: PlaceCategory,
}

/// Candidate place typed by the player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitPlaceRequest {
    #[validate(length(max = 120))]
    pub place: String,
}

/// Full observable state of a round.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundSnapshot {
    pub id: Uuid,
    pub player: String,
    pub category: PlaceCategory,
    pub phase: VisibleRoundPhase,
    pub score: u32,
    /// Letter the next place must start with; absent before the round starts.
    pub current_letter: Option<String>,
    pub time_left: u32,
    pub time_limit: u32,
    /// Accepted places, lowercased, in acceptance order.
    pub used_places: Vec<String>,
    pub is_submitting: bool,
    pub started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_over_reason: Option<GameOverDetails>,
}

impl RoundSnapshot {
    /// Snapshot `round` as owned by `session`.
    pub fn capture(session: &RoundSession, round: &RoundState) -> Self {
        let game_over_reason = match round.phase() {
            RoundPhase::GameOver(reason) => Some(reason.into()),
            _ => None,
        };

        Self {
            id: session.id(),
            player: session.player().to_owned(),
            category: session.category(),
            phase: round.phase().into(),
            score: round.score(),
            current_letter: round.current_letter().map(String::from),
            time_left: round.time_left(),
            time_limit: round.time_limit(),
            used_places: round.used_places().to_vec(),
            is_submitting: round.is_submitting(),
            started_at: format_system_time(session.started_at()),
            game_over_reason,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameOverKind {
    TimeUp,
    InvalidPlace,
}

/// Why a finished round ended.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameOverDetails {
    pub kind: GameOverKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_correction: Option<String>,
}

impl From<&GameOverReason> for GameOverDetails {
    fn from(value: &GameOverReason) -> Self {
        match value {
            GameOverReason::TimeUp => Self {
                kind: GameOverKind::TimeUp,
                place: None,
                suggested_correction: None,
            },
            GameOverReason::InvalidPlace {
                place,
                suggested_correction,
            } => Self {
                kind: GameOverKind::InvalidPlace,
                place: Some(place.clone()),
                suggested_correction: suggested_correction.clone(),
            },
        }
    }
}

/// Local rejection reasons, reported as game feedback rather than HTTP errors.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    Empty,
    WrongLetter,
    AlreadyUsed,
    Busy,
    RoundOver,
}

/// Result of one submission.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Accepted {
        place: String,
        next_letter: String,
        time_limit_reduced: bool,
    },
    Rejected {
        reason: RejectionKind,
        message: String,
    },
    GameOver {
        #[serde(skip_serializing_if = "Option::is_none")]
        suggested_correction: Option<String>,
        message: String,
    },
    ValidatorUnavailable {
        message: String,
    },
}

impl SubmissionOutcome {
    /// Feedback for a locally rejected submission.
    pub fn rejected(reason: RejectReason) -> Self {
        let (reason, message) = match reason {
            RejectReason::Empty => (RejectionKind::Empty, "Please enter a place name.".to_owned()),
            RejectReason::WrongLetter { expected } => (
                RejectionKind::WrongLetter,
                format!("The place must start with the letter \"{expected}\"."),
            ),
            RejectReason::AlreadyUsed => (
                RejectionKind::AlreadyUsed,
                "You've already entered this place.".to_owned(),
            ),
            RejectReason::Busy => (
                RejectionKind::Busy,
                "Your previous place is still being checked.".to_owned(),
            ),
            RejectReason::NotActive => (RejectionKind::RoundOver, "This round is over.".to_owned()),
        };
        SubmissionOutcome::Rejected { reason, message }
    }

    /// Feedback for a place the validator rejected.
    pub fn game_over(place: &str, suggested_correction: Option<String>) -> Self {
        let message = match &suggested_correction {
            Some(correction) => format!("Did you mean {correction}? Your streak ends here."),
            None => format!("\"{place}\" doesn't seem to be a real place."),
        };
        SubmissionOutcome::GameOver {
            suggested_correction,
            message,
        }
    }

    pub fn validator_unavailable() -> Self {
        SubmissionOutcome::ValidatorUnavailable {
            message: "Could not validate the place. Please try again.".to_owned(),
        }
    }
}

/// Outcome of a submission together with the round state after it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubmissionResponse {
    pub outcome: SubmissionOutcome,
    pub snapshot: RoundSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_are_tagged() {
        let value = serde_json::to_value(SubmissionOutcome::Accepted {
            place: "paris".into(),
            next_letter: "S".into(),
            time_limit_reduced: false,
        })
        .unwrap();
        assert_eq!(value["outcome"], "accepted");
        assert_eq!(value["next_letter"], "S");

        let value = serde_json::to_value(SubmissionOutcome::rejected(RejectReason::Busy)).unwrap();
        assert_eq!(value["outcome"], "rejected");
        assert_eq!(value["reason"], "busy");
    }

    #[test]
    fn wrong_letter_message_names_the_letter() {
        let SubmissionOutcome::Rejected { reason, message } =
            SubmissionOutcome::rejected(RejectReason::WrongLetter { expected: 'T' })
        else {
            panic!("expected a rejection");
        };
        assert_eq!(reason, RejectionKind::WrongLetter);
        assert!(message.contains("\"T\""));
    }

    #[test]
    fn game_over_message_mentions_correction() {
        let outcome = SubmissionOutcome::game_over("Pari", Some("Paris".into()));
        let value = serde_json::to_value(outcome).unwrap();
        assert_eq!(value["outcome"], "game_over");
        assert_eq!(value["suggested_correction"], "Paris");

        let value = serde_json::to_value(SubmissionOutcome::game_over("Xq", None)).unwrap();
        assert!(value.get("suggested_correction").is_none());
    }
}
