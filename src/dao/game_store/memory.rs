//! Process-local store used by tests and by `STORAGE_BACKEND=memory`.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use dashmap::DashMap;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::dao::{
    game_store::GameStore,
    models::{PlaceEntity, ScoreEntity, rank_scores},
    storage::{StorageError, StorageResult},
};

/// Failure reported while the memory store is switched offline.
#[derive(Debug, Error)]
#[error("memory store is offline")]
pub struct MemoryStoreOffline;

/// In-process store used when no database is configured, and by tests.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    scores: DashMap<String, ScoreEntity>,
    places: DashMap<String, PlaceEntity>,
    offline: AtomicBool,
}

impl MemoryGameStore {
    /// Empty, online store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails until switched back online.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Score currently stored for `name`.
    pub fn score_of(&self, name: &str) -> Option<ScoreEntity> {
        self.inner.scores.get(name).map(|entry| entry.clone())
    }

    /// Whether `name` (any case) is a known place.
    pub fn knows_place(&self, name: &str) -> bool {
        self.inner.places.contains_key(&name.to_lowercase())
    }

    fn ensure_online(&self) -> StorageResult<()> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable(
                "memory store offline".into(),
                MemoryStoreOffline,
            ));
        }
        Ok(())
    }
}

impl GameStore for MemoryGameStore {
    fn upsert_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            store.inner.scores.insert(score.name.clone(), score);
            Ok(())
        })
    }

    fn top_scores(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            let scores = store
                .inner
                .scores
                .iter()
                .map(|entry| entry.value().clone())
                .collect();
            Ok(rank_scores(scores, limit))
        })
    }

    fn find_place(&self, name: String) -> BoxFuture<'static, StorageResult<Option<PlaceEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            Ok(store
                .inner
                .places
                .get(&name.to_lowercase())
                .map(|entry| entry.clone()))
        })
    }

    fn save_place(&self, place: PlaceEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            store
                .inner
                .places
                .entry(place.name.clone())
                .or_insert(place);
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online() })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online() })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn score(name: &str, score: u32) -> ScoreEntity {
        ScoreEntity {
            name: name.into(),
            score,
            country: "🇺🇳".into(),
            created_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn upsert_overwrites_the_same_player() {
        let store = MemoryGameStore::new();
        store.upsert_score(score("Explorer", 12)).await.unwrap();
        store.upsert_score(score("Explorer", 3)).await.unwrap();

        assert_eq!(store.score_of("Explorer").unwrap().score, 3);
        assert_eq!(store.top_scores(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn top_scores_are_sorted_and_limited() {
        let store = MemoryGameStore::new();
        for (name, value) in [("a", 4), ("b", 9), ("c", 1), ("d", 7)] {
            store.upsert_score(score(name, value)).await.unwrap();
        }

        let top = store.top_scores(3).await.unwrap();
        let names: Vec<_> = top.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b", "d", "a"]);
    }

    #[tokio::test]
    async fn places_are_case_insensitive() {
        let store = MemoryGameStore::new();
        store.save_place(PlaceEntity::new("Lyon")).await.unwrap();

        assert!(store.find_place("LYON".into()).await.unwrap().is_some());
        assert!(store.knows_place("lyon"));
        assert!(store.find_place("Lille".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = MemoryGameStore::new();
        store.set_offline(true);

        assert!(store.upsert_score(score("x", 1)).await.is_err());
        assert!(store.top_scores(10).await.is_err());
        assert!(store.health_check().await.is_err());

        store.set_offline(false);
        assert!(store.health_check().await.is_ok());
    }
}
