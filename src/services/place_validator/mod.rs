//! Place-name validation: the oracle contract and its implementations.

mod gemini;
#[cfg(test)]
pub mod fixed;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub use gemini::GeminiValidator;

/// Family of places a round accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlaceCategory {
    /// Sovereign countries only.
    Countries,
    /// Capital cities only.
    Capitals,
    /// Countries, capitals, and states or provinces.
    CountriesCapitalsStates,
    /// Any real place on Earth.
    #[default]
    Any,
}

impl PlaceCategory {
    /// Wording used when describing the category to the oracle.
    pub fn label(self) -> &'static str {
        match self {
            PlaceCategory::Countries => "Countries",
            PlaceCategory::Capitals => "Capitals",
            PlaceCategory::CountriesCapitalsStates => "Countries + Capitals + States",
            PlaceCategory::Any => "Any",
        }
    }
}

/// A single validation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceQuery {
    /// Name as typed by the player.
    pub place_name: String,
    /// Category the name must belong to.
    pub category: PlaceCategory,
}

/// Oracle answer for one [`PlaceQuery`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ValidationResult {
    /// Whether the name designates a real place of the requested category.
    #[serde(rename = "isValid")]
    pub is_valid: bool,
    /// Close real place when the name looks misspelled.
    #[serde(rename = "suggestedCorrection", default)]
    pub suggested_correction: Option<String>,
}

impl ValidationResult {
    /// A positive answer.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            suggested_correction: None,
        }
    }

    /// A negative answer with an optional correction.
    pub fn invalid(suggested_correction: Option<String>) -> Self {
        Self {
            is_valid: false,
            suggested_correction: suggested_correction.filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Transport-level failures of the oracle; a round survives all of them.
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// No API key was configured for the generative backend.
    #[error("place validator is not configured (missing API key)")]
    MissingApiKey,
    /// The HTTP call could not be completed.
    #[error("failed to reach the place validator")]
    Transport {
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// The backend answered with a non-success status.
    #[error("place validator answered with status {status}")]
    Status {
        /// Status code returned by the backend.
        status: reqwest::StatusCode,
    },
    /// The answer did not contain a usable verdict.
    #[error("place validator returned an unreadable answer: {reason}")]
    MalformedAnswer {
        /// What was wrong with the answer.
        reason: String,
    },
    /// The call exceeded its time budget.
    #[error("place validator timed out")]
    Timeout,
}

/// Opaque asynchronous oracle judging whether a name designates a real place.
pub trait PlaceValidator: Send + Sync {
    /// Judge `query`; only transport problems are errors, a fake place is `Ok`.
    fn validate(&self, query: PlaceQuery) -> BoxFuture<'static, Result<ValidationResult, ValidatorError>>;
}
