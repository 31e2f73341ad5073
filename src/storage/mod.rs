//! Filesystem storage.
//!
//! - Normalized JSONL files (users, game catalog) as the source of truth
//! - Keyed stores with create/read/update/upsert/delete on top of them
//! - CSV input (steam ids) and dataset output
//! - Parquet copy of the dataset

pub mod csv;
pub mod jsonl;
pub mod parquet;
pub mod store;

pub use self::csv::{append_line, DatasetCsvWriter, SteamIdReader, DATASET_COLUMNS};
pub use self::jsonl::{EntityType, JsonlReader, JsonlWriter};
pub use self::parquet::{DatasetParquetReader, DatasetParquetWriter};
pub use self::store::{GameStore, Keyed, KeyedStore, UserStore};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    Parquet(String),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("{entity} {key} already exists")]
    Duplicate { entity: &'static str, key: String },
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn normalized_dir(&self) -> PathBuf {
        self.data_dir.join("normalized")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join("output")
    }

    pub fn entity_path(&self, entity: EntityType) -> PathBuf {
        self.normalized_dir().join(entity.filename())
    }

    pub fn users_path(&self) -> PathBuf {
        self.entity_path(EntityType::User)
    }

    pub fn games_path(&self) -> PathBuf {
        self.entity_path(EntityType::Game)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}
