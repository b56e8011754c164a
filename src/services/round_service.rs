//! Round orchestration: session lifecycle, the one-second countdown, and place submissions.
//!
//! The round lock is never held across the validator or storage calls, so ticks keep
//! flowing while a submission is being checked.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use tokio::time::{Instant, interval_at, sleep};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        round::{
            RoundSnapshot, StartRoundRequest, SubmissionOutcome, SubmissionResponse,
            SubmitPlaceRequest,
        },
        sse::PlaceAcceptedEvent,
        validation::validate_player_name,
    },
    error::ServiceError,
    services::{
        leaderboard_service, place_service,
        place_validator::{PlaceQuery, ValidationResult, ValidatorError},
        sse_events,
    },
    state::{
        RoundSession, SharedState,
        letters::random_letter,
        round::{RejectReason, Resolution, SubmissionTicket, TickOutcome, Verdict},
    },
};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Create a session, draw its first letter, and start the countdown.
pub async fn start_round(
    state: &SharedState,
    request: StartRoundRequest,
) -> Result<RoundSnapshot, ServiceError> {
    let player = request.player.trim();
    validate_player_name(player).map_err(|err| {
        ServiceError::InvalidInput(
            err.message
                .map(|message| message.into_owned())
                .unwrap_or_else(|| err.code.into_owned()),
        )
    })?;

    let session = Arc::new(RoundSession::new(
        player.to_owned(),
        request.category,
        state.config().rules(),
    ));
    let letter = draw_letter(state);

    let snapshot = {
        let mut round = session.round().lock().await;
        round.start(letter)?;
        RoundSnapshot::capture(&session, &round)
    };

    state.insert_session(session.clone());
    spawn_ticker(state, &session);

    info!(
        round_id = %session.id(),
        player = %session.player(),
        category = session.category().label(),
        %letter,
        "round started"
    );
    Ok(snapshot)
}

/// Current snapshot of a round.
pub async fn get_round(state: &SharedState, round_id: Uuid) -> Result<RoundSnapshot, ServiceError> {
    let session = find_session(state, round_id)?;
    let round = session.round().lock().await;
    Ok(RoundSnapshot::capture(&session, &round))
}

/// Check a candidate place against the round and, when it passes the local rules, the validator.
///
/// The verdict is applied on a detached task so a client disconnecting mid-check cannot leave
/// the round stuck in the submitting state.
pub async fn submit_place(
    state: &SharedState,
    round_id: Uuid,
    request: SubmitPlaceRequest,
) -> Result<SubmissionResponse, ServiceError> {
    let session = find_session(state, round_id)?;

    let ticket = {
        let mut round = session.round().lock().await;
        match round.begin_submission(&request.place) {
            Ok(ticket) => ticket,
            Err(reason) => {
                debug!(%round_id, place = %request.place, ?reason, "submission rejected locally");
                return Ok(SubmissionResponse {
                    outcome: SubmissionOutcome::rejected(reason),
                    snapshot: RoundSnapshot::capture(&session, &round),
                });
            }
        }
    };

    tokio::spawn(resolve_submission(state.clone(), session, ticket))
        .await
        .map_err(|err| ServiceError::Internal(format!("submission task failed: {err}")))
}

/// Drop a round ("play again" or leaving the page); its countdown stops immediately.
pub fn abandon_round(state: &SharedState, round_id: Uuid) -> Result<(), ServiceError> {
    let session = state
        .remove_session(round_id)
        .ok_or_else(|| round_not_found(round_id))?;
    session.cancel_ticker();
    info!(%round_id, player = %session.player(), "round abandoned");
    Ok(())
}

async fn resolve_submission(
    state: SharedState,
    session: Arc<RoundSession>,
    ticket: SubmissionTicket,
) -> SubmissionResponse {
    let query = PlaceQuery {
        place_name: ticket.place().to_owned(),
        category: session.category(),
    };
    let verdict = to_verdict(&session, place_service::validate_place(&state, query).await);

    let (resolution, snapshot) = {
        let mut round = session.round().lock().await;
        // An abandoned round is out of the registry; its verdict must not touch it.
        let resolution = if state.session(session.id()).is_some() {
            round.resolve(&ticket, verdict, || draw_letter(&state))
        } else {
            Resolution::Stale
        };
        (resolution, RoundSnapshot::capture(&session, &round))
    };

    let outcome = match resolution {
        Resolution::Accepted {
            place,
            next_letter,
            time_limit_reduced,
        } => {
            info!(
                round_id = %session.id(),
                %place,
                score = snapshot.score,
                %next_letter,
                time_limit_reduced,
                "place accepted"
            );
            sse_events::broadcast_place_accepted(
                &session,
                PlaceAcceptedEvent {
                    place: place.clone(),
                    score: snapshot.score,
                    next_letter: next_letter.to_string(),
                    time_limit: snapshot.time_limit,
                    time_limit_reduced,
                },
            );
            SubmissionOutcome::Accepted {
                place,
                next_letter: next_letter.to_string(),
                time_limit_reduced,
            }
        }
        Resolution::GameOver {
            score,
            suggested_correction,
        } => {
            info!(
                round_id = %session.id(),
                place = %ticket.place(),
                score,
                "round over: place rejected"
            );
            finish_round(&state, &session, snapshot.clone());
            SubmissionOutcome::game_over(ticket.place(), suggested_correction)
        }
        Resolution::Retry => SubmissionOutcome::validator_unavailable(),
        Resolution::Stale => {
            debug!(
                round_id = %session.id(),
                place = %ticket.place(),
                "verdict arrived after the round ended or was abandoned; discarded"
            );
            SubmissionOutcome::rejected(RejectReason::NotActive)
        }
    };

    SubmissionResponse { outcome, snapshot }
}

fn to_verdict(
    session: &RoundSession,
    result: Result<ValidationResult, ValidatorError>,
) -> Verdict {
    match result {
        Ok(result) if result.is_valid => Verdict::Valid,
        Ok(result) => Verdict::Invalid {
            suggested_correction: result.suggested_correction,
        },
        Err(err) => {
            warn!(round_id = %session.id(), error = %err, "place validation failed; round goes on");
            Verdict::Unavailable
        }
    }
}

fn spawn_ticker(state: &SharedState, session: &Arc<RoundSession>) {
    let handle = tokio::spawn(run_ticker(state.clone(), Arc::downgrade(session)));
    session.attach_ticker(handle.abort_handle());
}

async fn run_ticker(state: SharedState, session: Weak<RoundSession>) {
    let mut ticks = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);

    loop {
        ticks.tick().await;
        let Some(session) = session.upgrade() else {
            break;
        };

        let mut round = session.round().lock().await;
        let outcome = round.tick();
        match outcome {
            TickOutcome::Running { time_left } => {
                let time_limit = round.time_limit();
                drop(round);
                sse_events::broadcast_tick(&session, time_left, time_limit);
            }
            TickOutcome::Expired { score } => {
                let snapshot = RoundSnapshot::capture(&session, &round);
                drop(round);
                info!(round_id = %session.id(), score, "round over: time is up");
                finish_round(&state, &session, snapshot);
                break;
            }
            TickOutcome::Ignored => break,
        }
    }
}

/// Publish the final state, persist a non-zero score, and schedule eviction.
fn finish_round(state: &SharedState, session: &Arc<RoundSession>, snapshot: RoundSnapshot) {
    session.cancel_ticker();
    if state.session(session.id()).is_none() {
        debug!(round_id = %session.id(), "abandoned round finished; nothing to record");
        return;
    }

    let score = snapshot.score;
    sse_events::broadcast_round_over(session, snapshot);
    if score > 0 {
        tokio::spawn(save_final_score(state.clone(), session.clone(), score));
    }
    schedule_eviction(state, session.id());
}

async fn save_final_score(state: SharedState, session: Arc<RoundSession>, score: u32) {
    match leaderboard_service::record_score(&state, session.player(), score).await {
        Ok(()) => sse_events::broadcast_score_saved(&session, score),
        Err(err) => {
            warn!(
                round_id = %session.id(),
                player = %session.player(),
                score,
                error = %err,
                "failed to save final score"
            );
            sse_events::broadcast_score_save_failed(
                &session,
                score,
                "Could not save your score. Please try again later.".to_owned(),
            );
        }
    }
}

fn schedule_eviction(state: &SharedState, round_id: Uuid) {
    let state = state.clone();
    let grace = state.config().session_grace();
    tokio::spawn(async move {
        sleep(grace).await;
        if state.remove_session(round_id).is_some() {
            debug!(%round_id, "finished round evicted");
        }
    });
}

fn draw_letter(state: &SharedState) -> char {
    random_letter(&mut rand::rng(), state.config().alphabet())
}

fn find_session(state: &SharedState, round_id: Uuid) -> Result<Arc<RoundSession>, ServiceError> {
    state
        .session(round_id)
        .ok_or_else(|| round_not_found(round_id))
}

fn round_not_found(round_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("round {round_id} not found"))
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::game_store::memory::MemoryGameStore,
        dto::{
            phase::VisibleRoundPhase,
            round::{GameOverKind, RejectionKind},
            sse::ServerEvent,
        },
        services::{
            place_validator::{PlaceCategory, fixed::StaticValidator},
            sse_service,
        },
        state::{AppState, letters::Alphabet},
    };

    const PLAYER: &str = "Explorer";

    fn config() -> AppConfig {
        AppConfig::default().with_alphabet(Alphabet::new(['P']))
    }

    async fn setup_with(
        config: AppConfig,
        validator: StaticValidator,
    ) -> (SharedState, MemoryGameStore) {
        let store = MemoryGameStore::new();
        let state = AppState::new(config, Arc::new(validator));
        state.install_game_store(Arc::new(store.clone())).await;
        (state, store)
    }

    async fn setup(validator: StaticValidator) -> (SharedState, MemoryGameStore) {
        setup_with(config(), validator).await
    }

    async fn start(state: &SharedState) -> Uuid {
        let request = StartRoundRequest {
            player: PLAYER.into(),
            category: PlaceCategory::Any,
        };
        start_round(state, request).await.unwrap().id
    }

    async fn submit(state: &SharedState, id: Uuid, place: &str) -> SubmissionResponse {
        let request = SubmitPlaceRequest {
            place: place.into(),
        };
        submit_place(state, id, request).await.unwrap()
    }

    async fn next_event(events: &mut broadcast::Receiver<ServerEvent>, name: &str) -> ServerEvent {
        loop {
            match events.recv().await {
                Ok(event) if event.event.as_deref() == Some(name) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(err) => panic!("event stream closed while waiting for {name}: {err}"),
            }
        }
    }

    fn rejection(response: &SubmissionResponse) -> RejectionKind {
        match &response.outcome {
            SubmissionOutcome::Rejected { reason, .. } => *reason,
            other => panic!("expected a rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn start_round_draws_a_letter_and_starts_the_clock() {
        let (state, _store) = setup(StaticValidator::default()).await;
        let request = StartRoundRequest {
            player: "  Explorer  ".into(),
            category: PlaceCategory::Capitals,
        };

        let snapshot = start_round(&state, request).await.unwrap();

        assert_eq!(snapshot.phase, VisibleRoundPhase::Active);
        assert_eq!(snapshot.player, PLAYER);
        assert_eq!(snapshot.category, PlaceCategory::Capitals);
        assert_eq!(snapshot.current_letter.as_deref(), Some("P"));
        assert_eq!((snapshot.time_left, snapshot.time_limit), (60, 60));
        assert_eq!(snapshot.score, 0);
        assert!(snapshot.used_places.is_empty());
        assert_eq!(state.session_count(), 1);
    }

    #[tokio::test]
    async fn blank_players_are_refused() {
        let (state, _store) = setup(StaticValidator::default()).await;
        let request = StartRoundRequest {
            player: "   ".into(),
            category: PlaceCategory::Any,
        };

        assert!(matches!(
            start_round(&state, request).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert_eq!(state.session_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_place_moves_the_letter_and_resets_the_clock() {
        let (state, _store) = setup(StaticValidator::with_places(["Paris"])).await;
        let id = start(&state).await;
        let mut events = sse_service::subscribe_round(&state, id).unwrap();

        sleep(Duration::from_millis(10_500)).await;
        assert_eq!(get_round(&state, id).await.unwrap().time_left, 50);

        let response = submit(&state, id, "  Paris ").await;

        assert_eq!(
            response.outcome,
            SubmissionOutcome::Accepted {
                place: "paris".into(),
                next_letter: "S".into(),
                time_limit_reduced: false,
            }
        );
        assert_eq!(response.snapshot.score, 1);
        assert_eq!(response.snapshot.time_left, 60);
        assert_eq!(response.snapshot.current_letter.as_deref(), Some("S"));
        assert_eq!(response.snapshot.used_places, vec!["paris".to_string()]);
        assert!(!response.snapshot.is_submitting);

        let accepted = next_event(&mut events, "place.accepted").await;
        assert!(accepted.data.contains(r#""next_letter":"S""#));
    }

    #[tokio::test]
    async fn local_rejections_skip_the_validator() {
        let validator = StaticValidator::with_places(["Pap"]);
        let (state, _store) = setup(validator.clone()).await;
        let id = start(&state).await;

        assert_eq!(rejection(&submit(&state, id, "   ").await), RejectionKind::Empty);
        assert_eq!(
            rejection(&submit(&state, id, "London").await),
            RejectionKind::WrongLetter
        );
        assert_eq!(validator.calls(), 0);

        assert!(matches!(
            submit(&state, id, "Pap").await.outcome,
            SubmissionOutcome::Accepted { .. }
        ));
        let response = submit(&state, id, "PAP").await;
        assert_eq!(rejection(&response), RejectionKind::AlreadyUsed);
        assert_eq!(response.snapshot.score, 1);
        assert_eq!(validator.calls(), 1);
    }

    #[tokio::test]
    async fn second_submission_is_busy_while_the_first_is_checked() {
        let (validator, gate) = StaticValidator::with_places(["Paris", "Porto"]).gated();
        let (state, _store) = setup(validator.clone()).await;
        let id = start(&state).await;

        let pending = tokio::spawn({
            let state = state.clone();
            async move { submit(&state, id, "Paris").await }
        });
        while !get_round(&state, id).await.unwrap().is_submitting {
            tokio::task::yield_now().await;
        }

        let busy = submit(&state, id, "Porto").await;
        assert_eq!(rejection(&busy), RejectionKind::Busy);

        gate.notify_one();
        let first = pending.await.unwrap();
        assert!(matches!(first.outcome, SubmissionOutcome::Accepted { .. }));
        assert_eq!(validator.calls(), 1);
    }

    #[tokio::test]
    async fn invalid_place_ends_the_round_and_saves_the_score() {
        let validator = StaticValidator::with_places(["Pap"]).with_correction("Parris", "Paris");
        let (state, store) = setup(validator).await;
        let id = start(&state).await;
        let mut events = sse_service::subscribe_round(&state, id).unwrap();

        submit(&state, id, "Pap").await;
        let response = submit(&state, id, "Parris").await;

        let SubmissionOutcome::GameOver {
            suggested_correction,
            ..
        } = &response.outcome
        else {
            panic!("expected game over, got {:?}", response.outcome);
        };
        assert_eq!(suggested_correction.as_deref(), Some("Paris"));
        assert_eq!(response.snapshot.phase, VisibleRoundPhase::GameOver);
        assert_eq!(response.snapshot.score, 1);
        let reason = response.snapshot.game_over_reason.as_ref().unwrap();
        assert_eq!(reason.kind, GameOverKind::InvalidPlace);
        assert_eq!(reason.place.as_deref(), Some("Parris"));

        next_event(&mut events, "round.over").await;
        let saved = next_event(&mut events, "score.saved").await;
        assert_eq!(saved.data, r#"{"player":"Explorer","score":1}"#);
        assert_eq!(store.score_of(PLAYER).unwrap().score, 1);

        assert_eq!(
            rejection(&submit(&state, id, "Pap").await),
            RejectionKind::RoundOver
        );
    }

    #[tokio::test]
    async fn zero_scores_are_not_saved() {
        let (state, store) = setup(StaticValidator::default()).await;
        let id = start(&state).await;
        let mut events = sse_service::subscribe_round(&state, id).unwrap();

        let response = submit(&state, id, "Pxq").await;
        assert!(matches!(
            response.outcome,
            SubmissionOutcome::GameOver {
                suggested_correction: None,
                ..
            }
        ));

        next_event(&mut events, "round.over").await;
        tokio::task::yield_now().await;
        assert!(store.score_of(PLAYER).is_none());
    }

    #[tokio::test]
    async fn save_failures_are_reported_without_undoing_game_over() {
        let (state, store) = setup(StaticValidator::with_places(["Pap"])).await;
        let id = start(&state).await;
        let mut events = sse_service::subscribe_round(&state, id).unwrap();

        submit(&state, id, "Pap").await;
        store.set_offline(true);
        let response = submit(&state, id, "Pxq").await;
        assert!(matches!(response.outcome, SubmissionOutcome::GameOver { .. }));

        let failed = next_event(&mut events, "score.save_failed").await;
        assert!(failed.data.contains(r#""score":1"#));
        assert_eq!(
            get_round(&state, id).await.unwrap().phase,
            VisibleRoundPhase::GameOver
        );
    }

    #[tokio::test]
    async fn validator_outage_keeps_the_round_alive() {
        let (state, _store) = setup(StaticValidator::unavailable()).await;
        let id = start(&state).await;

        let response = submit(&state, id, "Paris").await;

        assert!(matches!(
            response.outcome,
            SubmissionOutcome::ValidatorUnavailable { .. }
        ));
        assert_eq!(response.snapshot.phase, VisibleRoundPhase::Active);
        assert_eq!(response.snapshot.score, 0);
        assert!(!response.snapshot.is_submitting);
        assert!(response.snapshot.used_places.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_expiry_ends_the_round() {
        let (state, _store) = setup(StaticValidator::default()).await;
        let id = start(&state).await;
        let mut events = sse_service::subscribe_round(&state, id).unwrap();

        let tick = next_event(&mut events, "tick").await;
        assert_eq!(tick.data, r#"{"time_left":59,"time_limit":60}"#);

        sleep(Duration::from_secs(60)).await;

        let snapshot = get_round(&state, id).await.unwrap();
        assert_eq!(snapshot.phase, VisibleRoundPhase::GameOver);
        assert_eq!(snapshot.time_left, 0);
        assert_eq!(
            snapshot.game_over_reason.map(|reason| reason.kind),
            Some(GameOverKind::TimeUp)
        );
        next_event(&mut events, "round.over").await;
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_expiry_saves_a_positive_score() {
        let (state, store) = setup(StaticValidator::with_places(["Pap"])).await;
        let id = start(&state).await;
        let mut events = sse_service::subscribe_round(&state, id).unwrap();

        submit(&state, id, "Pap").await;
        sleep(Duration::from_secs(61)).await;

        let snapshot = get_round(&state, id).await.unwrap();
        assert_eq!(snapshot.phase, VisibleRoundPhase::GameOver);
        assert_eq!(
            snapshot.game_over_reason.map(|reason| reason.kind),
            Some(GameOverKind::TimeUp)
        );
        next_event(&mut events, "round.over").await;
        let saved = next_event(&mut events, "score.saved").await;
        assert_eq!(saved.data, r#"{"player":"Explorer","score":1}"#);
        assert_eq!(store.score_of(PLAYER).map(|entry| entry.score), Some(1));
    }

    #[tokio::test]
    async fn verdict_after_abandon_is_discarded() {
        let (validator, gate) = StaticValidator::with_places(["Paris"]).gated();
        let (state, store) = setup(validator).await;
        let id = start(&state).await;
        let session = state.session(id).unwrap();
        let mut events = session.events().subscribe();

        let pending = tokio::spawn({
            let state = state.clone();
            async move { submit(&state, id, "Paris").await }
        });
        while !get_round(&state, id).await.unwrap().is_submitting {
            tokio::task::yield_now().await;
        }

        abandon_round(&state, id).unwrap();
        gate.notify_one();
        let response = pending.await.unwrap();

        assert_eq!(rejection(&response), RejectionKind::RoundOver);
        assert_eq!(response.snapshot.score, 0);
        assert!(response.snapshot.used_places.is_empty());
        assert_eq!(session.round().lock().await.score(), 0);
        assert!(matches!(
            events.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
        assert!(store.score_of(PLAYER).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn late_verdict_after_time_up_is_discarded() {
        let (validator, gate) = StaticValidator::with_places(["Paris"]).gated();
        let config = config().with_validator_timeout(Duration::from_secs(120));
        let (state, store) = setup_with(config, validator).await;
        let id = start(&state).await;

        let pending = tokio::spawn({
            let state = state.clone();
            async move { submit(&state, id, "Paris").await }
        });
        sleep(Duration::from_secs(61)).await;
        assert_eq!(
            get_round(&state, id).await.unwrap().phase,
            VisibleRoundPhase::GameOver
        );

        gate.notify_one();
        let response = pending.await.unwrap();

        assert_eq!(rejection(&response), RejectionKind::RoundOver);
        assert_eq!(response.snapshot.score, 0);
        assert!(response.snapshot.used_places.is_empty());
        assert_eq!(
            response.snapshot.game_over_reason.map(|reason| reason.kind),
            Some(GameOverKind::TimeUp)
        );
        assert!(store.score_of(PLAYER).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn finished_rounds_are_evicted_after_the_grace_period() {
        let config = config().with_session_grace(Duration::from_secs(30));
        let (state, _store) = setup_with(config, StaticValidator::default()).await;
        let id = start(&state).await;

        sleep(Duration::from_secs(75)).await;
        assert!(get_round(&state, id).await.is_ok());

        sleep(Duration::from_secs(20)).await;
        assert!(matches!(
            get_round(&state, id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_rounds_stop_and_disappear() {
        let (state, store) = setup(StaticValidator::with_places(["Pap"])).await;
        let id = start(&state).await;
        submit(&state, id, "Pap").await;

        abandon_round(&state, id).unwrap();
        sleep(Duration::from_secs(120)).await;

        assert!(matches!(
            get_round(&state, id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            abandon_round(&state, id),
            Err(ServiceError::NotFound(_))
        ));
        assert!(store.score_of(PLAYER).is_none());
    }
}
