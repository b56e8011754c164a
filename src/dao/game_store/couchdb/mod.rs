mod config;
mod error;
mod models;
mod store;

pub use config::CouchConfig;
pub use error::CouchDaoError;
pub use store::CouchGameStore;

use crate::dao::storage::StorageError;

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        match err {
            CouchDaoError::DeserializeValue { path, source } => StorageError::Malformed {
                key: path,
                reason: source.to_string(),
            },
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
