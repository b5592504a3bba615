pub mod collections;
pub mod db;

pub use collections::{Collection, CollectionStore, StorageError};
pub use db::{create_db, DbPool};
