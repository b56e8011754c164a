use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Client, Collection, Database, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoPlaceDocument, MongoScoreDocument, doc_id},
};
use crate::dao::{
    game_store::GameStore,
    models::{PlaceEntity, ScoreEntity},
    storage::StorageResult,
};

const SCORE_COLLECTION_NAME: &str = "scores";
const PLACE_COLLECTION_NAME: &str = "places";

#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    // Kept alive alongside the database handle it produced.
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.score_collection().await;
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"score": -1})
            .options(
                IndexOptions::builder()
                    .name(Some("score_desc_idx".to_owned()))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SCORE_COLLECTION_NAME,
                index: "score",
                source,
            })?;

        Ok(())
    }

    async fn score_collection(&self) -> Collection<MongoScoreDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoScoreDocument>(SCORE_COLLECTION_NAME)
    }

    async fn place_collection(&self) -> Collection<MongoPlaceDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoPlaceDocument>(PLACE_COLLECTION_NAME)
    }

    async fn upsert_score(&self, score: ScoreEntity) -> MongoResult<()> {
        let name = score.name.clone();
        let document: MongoScoreDocument = score.into();
        let collection = self.score_collection().await;
        collection
            .replace_one(doc_id(&name), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveScore { name, source })?;

        Ok(())
    }

    async fn top_scores(&self, limit: usize) -> MongoResult<Vec<ScoreEntity>> {
        let collection = self.score_collection().await;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let documents: Vec<MongoScoreDocument> = collection
            .find(doc! {})
            .sort(doc! {"score": -1, "name": 1})
            .limit(limit)
            .await
            .map_err(|source| MongoDaoError::ListScores { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListScores { source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn find_place(&self, name: String) -> MongoResult<Option<PlaceEntity>> {
        let key = name.to_lowercase();
        let collection = self.place_collection().await;
        let document = collection
            .find_one(doc_id(&key))
            .await
            .map_err(|source| MongoDaoError::LoadPlace { name: key, source })?;

        Ok(document.map(Into::into))
    }

    async fn save_place(&self, place: PlaceEntity) -> MongoResult<()> {
        let name = place.name.clone();
        let document: MongoPlaceDocument = place.into();
        let collection = self.place_collection().await;
        collection
            .replace_one(doc_id(&name), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SavePlace { name, source })?;

        Ok(())
    }
}

impl GameStore for MongoGameStore {
    fn upsert_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_score(score).await.map_err(Into::into) })
    }

    fn top_scores(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.top_scores(limit).await.map_err(Into::into) })
    }

    fn find_place(&self, name: String) -> BoxFuture<'static, StorageResult<Option<PlaceEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_place(name).await.map_err(Into::into) })
    }

    fn save_place(&self, place: PlaceEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_place(place).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
