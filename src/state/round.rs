//! Round state machine driving a single play session.
//!
//! The machine is synchronous and owns no timers or I/O: the round service feeds it one
//! [`RoundState::tick`] per elapsed second and brackets every place-name check with
//! [`RoundState::begin_submission`] / [`RoundState::resolve`].

use serde::Deserialize;
use thiserror::Error;

/// Timing and scoring constants applied to a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoundRules {
    /// Time budget (seconds) granted when the round starts.
    pub initial_time_secs: u32,
    /// Amount removed from the time budget at every milestone.
    pub time_decrement_secs: u32,
    /// Number of accepted places between two time reductions.
    pub score_milestone: u32,
    /// The time budget never drops below this value.
    pub time_floor_secs: u32,
}

impl Default for RoundRules {
    fn default() -> Self {
        Self {
            initial_time_secs: 60,
            time_decrement_secs: 2,
            score_milestone: 5,
            time_floor_secs: 10,
        }
    }
}

/// High-level phases a round can be in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundPhase {
    /// Created but no letter drawn yet.
    Idle,
    /// Timer running, submissions accepted.
    Active,
    /// Terminal phase; only a brand-new round can be played afterwards.
    GameOver(GameOverReason),
}

/// Why a round ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOverReason {
    /// The countdown reached zero.
    TimeUp,
    /// The validator rejected a submitted place.
    InvalidPlace {
        /// Place as typed by the player (trimmed).
        place: String,
        /// Close real place the validator proposed, if any.
        suggested_correction: Option<String>,
    },
}

/// Local reasons for refusing a submission before the validator is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Blank input.
    Empty,
    /// First letter differs from the required one.
    WrongLetter {
        /// Letter the round expects.
        expected: char,
    },
    /// Place already accepted earlier in the round.
    AlreadyUsed,
    /// Another submission is still being validated.
    Busy,
    /// Round is not active (not started yet or over).
    NotActive,
}

/// Validator answer fed back into [`RoundState::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The place exists.
    Valid,
    /// The place does not exist; ends the round.
    Invalid {
        /// Optional correction to surface to the player.
        suggested_correction: Option<String>,
    },
    /// The validator could not be reached; the round goes on.
    Unavailable,
}

/// Effect of resolving a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Place accepted; score and letter moved on.
    Accepted {
        /// Lowercased place added to the history.
        place: String,
        /// Letter required by the next submission.
        next_letter: char,
        /// True when this acceptance crossed a milestone and shortened the timer.
        time_limit_reduced: bool,
    },
    /// The round just ended because the place was rejected.
    GameOver {
        /// Final score (unchanged by the rejected submission).
        score: u32,
        /// Correction proposed by the validator.
        suggested_correction: Option<String>,
    },
    /// Validator unavailable; submission cleared so the player can retry.
    Retry,
    /// The ticket no longer matches the round (time ran out meanwhile); nothing changed.
    Stale,
}

/// Effect of a one-second tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Countdown still running.
    Running {
        /// Seconds left after this tick.
        time_left: u32,
    },
    /// This tick exhausted the countdown and ended the round.
    Expired {
        /// Final score.
        score: u32,
    },
    /// Round is not active; the tick was ignored.
    Ignored,
}

/// Error returned when starting a round that already left the idle phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: cannot start a round while in {from:?}")]
pub struct InvalidTransition {
    /// Phase the round was in.
    pub from: RoundPhase,
}

/// Proof that a submission passed the local checks and is awaiting the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionTicket {
    attempt: u64,
    place: String,
}

impl SubmissionTicket {
    /// Trimmed place name to hand to the validator.
    pub fn place(&self) -> &str {
        &self.place
    }
}

/// Mutable state of one round.
#[derive(Debug, Clone)]
pub struct RoundState {
    rules: RoundRules,
    phase: RoundPhase,
    score: u32,
    current_letter: Option<char>,
    time_left: u32,
    time_limit: u32,
    used_places: Vec<String>,
    attempts: u64,
    in_flight: Option<u64>,
}

impl RoundState {
    /// Create an idle round with a full time budget.
    pub fn new(rules: RoundRules) -> Self {
        let time_limit = rules.initial_time_secs.max(rules.time_floor_secs);
        Self {
            rules,
            phase: RoundPhase::Idle,
            score: 0,
            current_letter: None,
            time_left: time_limit,
            time_limit,
            used_places: Vec::new(),
            attempts: 0,
            in_flight: None,
        }
    }

    /// Draw the opening letter and start the countdown.
    pub fn start(&mut self, letter: char) -> Result<(), InvalidTransition> {
        if self.phase != RoundPhase::Idle {
            return Err(InvalidTransition {
                from: self.phase.clone(),
            });
        }

        self.current_letter = Some(letter.to_ascii_uppercase());
        self.phase = RoundPhase::Active;
        Ok(())
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != RoundPhase::Active {
            return TickOutcome::Ignored;
        }

        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left > 0 {
            return TickOutcome::Running {
                time_left: self.time_left,
            };
        }

        self.in_flight = None;
        self.phase = RoundPhase::GameOver(GameOverReason::TimeUp);
        TickOutcome::Expired { score: self.score }
    }

    /// Run the local checks on `candidate` and, when they pass, mark a submission as in flight.
    ///
    /// A rejection never mutates the round.
    pub fn begin_submission(&mut self, candidate: &str) -> Result<SubmissionTicket, RejectReason> {
        if self.phase != RoundPhase::Active {
            return Err(RejectReason::NotActive);
        }
        if self.in_flight.is_some() {
            return Err(RejectReason::Busy);
        }

        let place = candidate.trim();
        let Some(first) = place.chars().next() else {
            return Err(RejectReason::Empty);
        };

        let expected = self.current_letter.ok_or(RejectReason::NotActive)?;
        if !first.to_uppercase().eq(std::iter::once(expected)) {
            return Err(RejectReason::WrongLetter { expected });
        }

        let lowered = place.to_lowercase();
        if self.used_places.contains(&lowered) {
            return Err(RejectReason::AlreadyUsed);
        }

        self.attempts += 1;
        self.in_flight = Some(self.attempts);
        Ok(SubmissionTicket {
            attempt: self.attempts,
            place: place.to_owned(),
        })
    }

    /// Apply the validator verdict for `ticket`.
    ///
    /// `fallback_letter` is only called when the accepted place does not end with an ASCII
    /// letter.
    pub fn resolve<F>(
        &mut self,
        ticket: &SubmissionTicket,
        verdict: Verdict,
        fallback_letter: F,
    ) -> Resolution
    where
        F: FnOnce() -> char,
    {
        if self.phase != RoundPhase::Active || self.in_flight != Some(ticket.attempt) {
            return Resolution::Stale;
        }
        self.in_flight = None;

        match verdict {
            Verdict::Valid => self.accept(&ticket.place, fallback_letter),
            Verdict::Invalid {
                suggested_correction,
            } => {
                self.phase = RoundPhase::GameOver(GameOverReason::InvalidPlace {
                    place: ticket.place.clone(),
                    suggested_correction: suggested_correction.clone(),
                });
                Resolution::GameOver {
                    score: self.score,
                    suggested_correction,
                }
            }
            Verdict::Unavailable => Resolution::Retry,
        }
    }

    fn accept<F>(&mut self, place: &str, fallback_letter: F) -> Resolution
    where
        F: FnOnce() -> char,
    {
        self.score += 1;
        let lowered = place.to_lowercase();
        self.used_places.push(lowered.clone());

        let next_letter = match place.chars().last() {
            Some(last) if last.is_ascii_alphabetic() => last.to_ascii_uppercase(),
            _ => fallback_letter().to_ascii_uppercase(),
        };
        self.current_letter = Some(next_letter);

        let time_limit_reduced = self.step_down_time_limit();
        self.time_left = self.time_limit;

        Resolution::Accepted {
            place: lowered,
            next_letter,
            time_limit_reduced,
        }
    }

    fn step_down_time_limit(&mut self) -> bool {
        let RoundRules {
            time_decrement_secs,
            score_milestone,
            time_floor_secs,
            ..
        } = self.rules;

        if score_milestone == 0 || self.score % score_milestone != 0 {
            return false;
        }

        match self.time_limit.checked_sub(time_decrement_secs) {
            Some(reduced) if reduced >= time_floor_secs && reduced < self.time_limit => {
                self.time_limit = reduced;
                true
            }
            _ => false,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> &RoundPhase {
        &self.phase
    }

    /// Whether the round reached its terminal phase.
    pub fn is_over(&self) -> bool {
        matches!(self.phase, RoundPhase::GameOver(_))
    }

    /// Number of accepted places.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Letter the next submission must start with (`None` before the round starts).
    pub fn current_letter(&self) -> Option<char> {
        self.current_letter
    }

    /// Seconds left on the countdown.
    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    /// Current ceiling of the countdown.
    pub fn time_limit(&self) -> u32 {
        self.time_limit
    }

    /// Accepted places, lowercased, oldest first.
    pub fn used_places(&self) -> &[String] {
        &self.used_places
    }

    /// Whether a submission is awaiting its verdict.
    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Rules the round was created with.
    pub fn rules(&self) -> RoundRules {
        self.rules
    }
}
