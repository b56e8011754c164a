use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use crate::dao::models::{PlaceEntity, ScoreEntity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoScoreDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    score: i64,
    country: String,
    created_at: DateTime,
}

impl From<ScoreEntity> for MongoScoreDocument {
    fn from(value: ScoreEntity) -> Self {
        Self {
            id: value.name.clone(),
            name: value.name,
            score: i64::from(value.score),
            country: value.country,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoScoreDocument> for ScoreEntity {
    fn from(value: MongoScoreDocument) -> Self {
        Self {
            name: value.name,
            score: u32::try_from(value.score.max(0)).unwrap_or(u32::MAX),
            country: value.country,
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlaceDocument {
    #[serde(rename = "_id")]
    id: String,
    recorded_at: DateTime,
}

impl From<PlaceEntity> for MongoPlaceDocument {
    fn from(value: PlaceEntity) -> Self {
        Self {
            id: value.name,
            recorded_at: DateTime::from_system_time(value.recorded_at),
        }
    }
}

impl From<MongoPlaceDocument> for PlaceEntity {
    fn from(value: MongoPlaceDocument) -> Self {
        Self {
            name: value.id,
            recorded_at: value.recorded_at.to_system_time(),
        }
    }
}

pub fn doc_id(id: &str) -> Document {
    doc! {"_id": id}
}
