//! Oracle backed by the Google Generative Language `generateContent` endpoint.

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PlaceQuery, PlaceValidator, ValidationResult, ValidatorError};
use crate::config::ValidatorConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Place oracle asking a Gemini model whether a name is a real place.
#[derive(Clone)]
pub struct GeminiValidator {
    client: Client,
    url: Arc<str>,
    api_key: Option<Arc<str>>,
}

impl GeminiValidator {
    /// Build a validator for `config`; without `api_key` every call fails with
    /// [`ValidatorError::MissingApiKey`].
    pub fn new(config: &ValidatorConfig, api_key: Option<String>) -> Self {
        let url = format!(
            "{}/models/{}:generateContent",
            config.endpoint.trim_end_matches('/'),
            config.model
        );
        Self {
            client: Client::new(),
            url: Arc::from(url),
            api_key: api_key
                .filter(|key| !key.trim().is_empty())
                .map(Arc::from),
        }
    }

    async fn ask(&self, query: PlaceQuery) -> Result<ValidationResult, ValidatorError> {
        let api_key = self.api_key.as_deref().ok_or(ValidatorError::MissingApiKey)?;
        let request = GenerateRequest::for_query(&query);

        let response = self
            .client
            .post(self.url.as_ref())
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await
            .map_err(|source| ValidatorError::Transport { source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ValidatorError::Status { status });
        }

        let payload = response
            .json::<GenerateResponse>()
            .await
            .map_err(|source| ValidatorError::Transport { source })?;

        let result = parse_answer(payload)?;
        debug!(
            place = %query.place_name,
            category = query.category.label(),
            is_valid = result.is_valid,
            "oracle verdict"
        );
        Ok(result)
    }
}

impl PlaceValidator for GeminiValidator {
    fn validate(
        &self,
        query: PlaceQuery,
    ) -> BoxFuture<'static, Result<ValidationResult, ValidatorError>> {
        let validator = self.clone();
        Box::pin(async move { validator.ask(query).await })
    }
}

fn prompt(query: &PlaceQuery) -> String {
    format!(
        "You are a geography expert. Your task is to validate if a given place name is a real \
         place, optionally within a specific category (countries, capitals, states, or any real \
         place). Handle misspellings and suggest a correction when the name is close to a real \
         one. Be case insensitive in your matching.\n\n\
         Place Name: {}\nCategory: {}\n\n\
         Respond with a JSON object with two fields:\n\
         - isValid (boolean): true if the place name is valid, false otherwise.\n\
         - suggestedCorrection (string, optional): a real place name close to the input when it \
         is invalid. Omit the field when there is no close match.\n\n\
         Example: {{\"placeName\": \"Pari\", \"category\": \"Capitals\"}} -> \
         {{\"isValid\": false, \"suggestedCorrection\": \"Paris\"}}\n\
         Example: {{\"placeName\": \"London\", \"category\": \"Capitals\"}} -> {{\"isValid\": true}}\n\
         Example: {{\"placeName\": \"Atlantis\", \"category\": \"Any\"}} -> {{\"isValid\": false}}",
        query.place_name,
        query.category.label()
    )
}

/// Extract the verdict from the first candidate of a `generateContent` response.
fn parse_answer(payload: GenerateResponse) -> Result<ValidationResult, ValidatorError> {
    let text = payload
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ValidatorError::MalformedAnswer {
            reason: "no candidate text".into(),
        })?;

    let json = strip_code_fence(&text);
    let parsed: ValidationResult =
        serde_json::from_str(json).map_err(|err| ValidatorError::MalformedAnswer {
            reason: err.to_string(),
        })?;

    Ok(if parsed.is_valid {
        ValidationResult::valid()
    } else {
        ValidationResult::invalid(parsed.suggested_correction)
    })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl GenerateRequest {
    fn for_query(query: &PlaceQuery) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part {
                    text: Some(prompt(query)),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.0,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::place_validator::PlaceCategory;

    fn response(text: &str) -> GenerateResponse {
        serde_json::from_value(serde_json::json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        }))
        .unwrap()
    }

    #[test]
    fn parses_positive_answer() {
        let result = parse_answer(response(r#"{"isValid": true}"#)).unwrap();
        assert_eq!(result, ValidationResult::valid());
    }

    #[test]
    fn parses_fenced_answer_with_correction() {
        let text = "```json\n{\"isValid\": false, \"suggestedCorrection\": \"Paris\"}\n```";
        let result = parse_answer(response(text)).unwrap();
        assert_eq!(result, ValidationResult::invalid(Some("Paris".into())));
    }

    #[test]
    fn valid_answers_drop_corrections() {
        let text = r#"{"isValid": true, "suggestedCorrection": "Lyon"}"#;
        assert_eq!(parse_answer(response(text)).unwrap().suggested_correction, None);
    }

    #[test]
    fn empty_candidates_are_malformed() {
        let payload: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(matches!(
            parse_answer(payload),
            Err(ValidatorError::MalformedAnswer { .. })
        ));
    }

    #[test]
    fn non_json_text_is_malformed() {
        assert!(matches!(
            parse_answer(response("Paris is a real place.")),
            Err(ValidatorError::MalformedAnswer { .. })
        ));
    }

    #[test]
    fn request_carries_name_and_category() {
        let query = PlaceQuery {
            place_name: "Pari".into(),
            category: PlaceCategory::Capitals,
        };
        let value = serde_json::to_value(GenerateRequest::for_query(&query)).unwrap();
        let text = value["contents"][0]["parts"][0]["text"].as_str().unwrap();

        assert!(text.contains("Place Name: Pari"));
        assert!(text.contains("Category: Capitals"));
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let validator = GeminiValidator::new(&ValidatorConfig::default(), Some("  ".into()));
        let err = validator
            .validate(PlaceQuery {
                place_name: "Oslo".into(),
                category: PlaceCategory::Any,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ValidatorError::MissingApiKey));
    }
}
