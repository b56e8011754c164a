//! Deterministic oracles for tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use futures::future::BoxFuture;
use tokio::sync::Notify;

use super::{PlaceQuery, PlaceValidator, ValidationResult, ValidatorError};

/// Oracle answering from a fixed list, counting every call.
#[derive(Clone, Default)]
pub struct StaticValidator {
    known: Arc<HashSet<String>>,
    corrections: Arc<HashMap<String, String>>,
    unavailable: bool,
    gate: Option<Arc<Notify>>,
    calls: Arc<AtomicUsize>,
}

impl StaticValidator {
    /// Accept exactly the given places (case-insensitive).
    pub fn with_places<'a>(places: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            known: Arc::new(places.into_iter().map(str::to_lowercase).collect()),
            ..Self::default()
        }
    }

    /// Suggest `correction` whenever `place` is rejected.
    pub fn with_correction(mut self, place: &str, correction: &str) -> Self {
        let mut corrections = (*self.corrections).clone();
        corrections.insert(place.to_lowercase(), correction.to_owned());
        self.corrections = Arc::new(corrections);
        self
    }

    /// Fail every call as if the backend could not be reached.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Hold every answer until the returned handle is notified.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    /// Number of validation calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PlaceValidator for StaticValidator {
    fn validate(
        &self,
        query: PlaceQuery,
    ) -> BoxFuture<'static, Result<ValidationResult, ValidatorError>> {
        let validator = self.clone();
        validator.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if let Some(gate) = &validator.gate {
                gate.notified().await;
            }
            if validator.unavailable {
                return Err(ValidatorError::Timeout);
            }

            let key = query.place_name.trim().to_lowercase();
            if validator.known.contains(&key) {
                Ok(ValidationResult::valid())
            } else {
                Ok(ValidationResult::invalid(
                    validator.corrections.get(&key).cloned(),
                ))
            }
        })
    }
}
