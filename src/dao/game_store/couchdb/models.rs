use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dao::models::{PlaceEntity, ScoreEntity};

pub const SCORE_PREFIX: &str = "score::";
pub const PLACE_PREFIX: &str = "place::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    #[serde(default)]
    pub doc: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchScoreDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub score: ScoreBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBody {
    pub name: String,
    pub score: u32,
    pub country: String,
    pub created_at: SystemTime,
}

impl CouchScoreDocument {
    pub fn from_entity(entity: ScoreEntity) -> Self {
        Self {
            id: score_doc_id(&entity.name),
            rev: None,
            score: ScoreBody {
                name: entity.name,
                score: entity.score,
                country: entity.country,
                created_at: entity.created_at,
            },
        }
    }

    pub fn into_entity(self) -> ScoreEntity {
        ScoreEntity {
            name: self.score.name,
            score: self.score.score,
            country: self.score.country,
            created_at: self.score.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchPlaceDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub name: String,
    pub recorded_at: SystemTime,
}

impl CouchPlaceDocument {
    pub fn from_entity(entity: PlaceEntity) -> Self {
        Self {
            id: place_doc_id(&entity.name),
            rev: None,
            name: entity.name,
            recorded_at: entity.recorded_at,
        }
    }

    pub fn into_entity(self) -> PlaceEntity {
        PlaceEntity {
            name: self.name,
            recorded_at: self.recorded_at,
        }
    }
}

pub fn score_doc_id(name: &str) -> String {
    format!("{SCORE_PREFIX}{name}")
}

pub fn place_doc_id(name: &str) -> String {
    format!("{PLACE_PREFIX}{}", name.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_document_flattens_body_and_omits_missing_rev() {
        let doc = CouchScoreDocument::from_entity(ScoreEntity {
            name: "Explorer".into(),
            score: 7,
            country: "🇺🇳".into(),
            created_at: SystemTime::UNIX_EPOCH,
        });
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["_id"], "score::Explorer");
        assert_eq!(value["score"], 7);
        assert!(value.get("_rev").is_none());
    }

    #[test]
    fn place_ids_are_lowercased() {
        assert_eq!(place_doc_id("Kyoto"), "place::kyoto");
        let doc = CouchPlaceDocument::from_entity(PlaceEntity::new("  Oslo "));
        assert_eq!(doc.id, "place::oslo");
        assert_eq!(doc.into_entity().name, "oslo");
    }
}
