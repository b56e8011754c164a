use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::services::place_validator::{PlaceCategory, ValidationResult};

/// Ask whether a place exists, independently of any round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ValidatePlaceRequest {
    #[validate(length(min = 1, max = 120))]
    pub place_name: String,
    #[serde(default)]
    pub category: PlaceCategory,
}

#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct ValidatePlaceResponse {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_correction: Option<String>,
}

impl From<ValidationResult> for ValidatePlaceResponse {
    fn from(value: ValidationResult) -> Self {
        Self {
            is_valid: value.is_valid,
            suggested_correction: value.suggested_correction,
        }
    }
}
