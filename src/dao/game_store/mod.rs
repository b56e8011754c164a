#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{PlaceEntity, ScoreEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for scores and known places.
pub trait GameStore: Send + Sync {
    /// Insert or overwrite the score record keyed by `score.name`.
    fn upsert_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Best `limit` scores, highest first.
    fn top_scores(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>>;
    /// Look a known place up by its lowercased name.
    fn find_place(&self, name: String) -> BoxFuture<'static, StorageResult<Option<PlaceEntity>>>;
    /// Remember a confirmed place.
    fn save_place(&self, place: PlaceEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
