use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{
    dao::models::PlaceEntity,
    dto::place::{ValidatePlaceRequest, ValidatePlaceResponse},
    error::ServiceError,
    services::place_validator::{PlaceCategory, PlaceQuery, ValidationResult, ValidatorError},
    state::SharedState,
};

/// Check a place against the known-places cache, then the oracle.
///
/// Only `any` queries trust the cache: a place recorded for a narrower category is a real
/// place, but not the other way round. Cache failures fall through to the oracle and positive
/// oracle answers are recorded on a best-effort basis.
pub async fn validate_place(
    state: &SharedState,
    query: PlaceQuery,
) -> Result<ValidationResult, ValidatorError> {
    if query.category == PlaceCategory::Any && is_known_place(state, &query.place_name).await {
        debug!(place = %query.place_name, "place found in cache");
        return Ok(ValidationResult::valid());
    }

    let place_name = query.place_name.clone();
    let result = ask_oracle(state, query).await?;
    if result.is_valid {
        remember_place(state, &place_name).await;
    }
    Ok(result)
}

/// Validate a place outside of a round.
pub async fn check_place(
    state: &SharedState,
    request: ValidatePlaceRequest,
) -> Result<ValidatePlaceResponse, ServiceError> {
    let place_name = request.place_name.trim();
    if place_name.is_empty() {
        return Err(ServiceError::InvalidInput("place_name must not be blank".into()));
    }

    let query = PlaceQuery {
        place_name: place_name.to_owned(),
        category: request.category,
    };
    let result = validate_place(state, query).await?;
    Ok(result.into())
}

async fn is_known_place(state: &SharedState, name: &str) -> bool {
    let Some(store) = state.game_store().await else {
        return false;
    };

    match store.find_place(name.to_owned()).await {
        Ok(found) => found.is_some(),
        Err(err) => {
            warn!(place = %name, error = %err, "known-place lookup failed; asking the validator");
            false
        }
    }
}

async fn ask_oracle(
    state: &SharedState,
    query: PlaceQuery,
) -> Result<ValidationResult, ValidatorError> {
    let limit = state.config().validator().timeout;
    match timeout(limit, state.validator().validate(query)).await {
        Ok(result) => result,
        Err(_) => Err(ValidatorError::Timeout),
    }
}

async fn remember_place(state: &SharedState, name: &str) {
    let Some(store) = state.game_store().await else {
        return;
    };

    if let Err(err) = store.save_place(PlaceEntity::new(name)).await {
        warn!(place = %name, error = %err, "failed to record validated place");
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::game_store::{GameStore, memory::MemoryGameStore},
        services::place_validator::fixed::StaticValidator,
        state::AppState,
    };

    async fn setup(validator: StaticValidator) -> (SharedState, MemoryGameStore) {
        let store = MemoryGameStore::new();
        let state = AppState::new(AppConfig::default(), Arc::new(validator));
        state.install_game_store(Arc::new(store.clone())).await;
        (state, store)
    }

    fn any(name: &str) -> PlaceQuery {
        PlaceQuery {
            place_name: name.into(),
            category: PlaceCategory::Any,
        }
    }

    #[tokio::test]
    async fn positive_answers_are_cached() {
        let validator = StaticValidator::with_places(["Lisbon"]);
        let (state, store) = setup(validator.clone()).await;

        assert!(validate_place(&state, any("Lisbon")).await.unwrap().is_valid);
        assert!(store.knows_place("lisbon"));

        assert!(validate_place(&state, any("LISBON")).await.unwrap().is_valid);
        assert_eq!(validator.calls(), 1);
    }

    #[tokio::test]
    async fn negative_answers_are_not_cached() {
        let validator = StaticValidator::with_places(["Lisbon"]).with_correction("Lisbn", "Lisbon");
        let (state, store) = setup(validator.clone()).await;

        let result = validate_place(&state, any("Lisbn")).await.unwrap();
        assert_eq!(result, ValidationResult::invalid(Some("Lisbon".into())));
        assert!(!store.knows_place("lisbn"));
    }

    #[tokio::test]
    async fn narrower_categories_skip_the_cache() {
        let validator = StaticValidator::with_places(["Texas"]);
        let (state, store) = setup(validator.clone()).await;
        store.save_place(PlaceEntity::new("Texas")).await.unwrap();

        let query = PlaceQuery {
            place_name: "Texas".into(),
            category: PlaceCategory::Countries,
        };
        validate_place(&state, query).await.unwrap();
        assert_eq!(validator.calls(), 1);
    }

    #[tokio::test]
    async fn offline_store_falls_back_to_the_oracle() {
        let validator = StaticValidator::with_places(["Oslo"]);
        let (state, store) = setup(validator.clone()).await;
        store.set_offline(true);

        assert!(validate_place(&state, any("Oslo")).await.unwrap().is_valid);
        assert_eq!(validator.calls(), 1);
    }

    #[tokio::test]
    async fn degraded_mode_still_validates() {
        let validator = StaticValidator::with_places(["Oslo"]);
        let state = AppState::new(AppConfig::default(), Arc::new(validator));

        assert!(validate_place(&state, any("Oslo")).await.unwrap().is_valid);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_oracle_times_out() {
        let (validator, _gate) = StaticValidator::with_places(["Oslo"]).gated();
        let config = AppConfig::default().with_validator_timeout(Duration::from_secs(2));
        let state = AppState::new(config, Arc::new(validator));

        let err = validate_place(&state, any("Oslo")).await.unwrap_err();
        assert!(matches!(err, ValidatorError::Timeout));
    }

    #[tokio::test]
    async fn blank_requests_are_rejected() {
        let (state, _store) = setup(StaticValidator::default()).await;
        let request = ValidatePlaceRequest {
            place_name: "   ".into(),
            category: PlaceCategory::Any,
        };
        assert!(matches!(
            check_place(&state, request).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }
}
