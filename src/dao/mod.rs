/// Score and known-place storage behind a backend-agnostic trait.
pub mod game_store;
/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
