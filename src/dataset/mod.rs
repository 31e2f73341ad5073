//! Dataset export.
//!
//! Turns every stored user into one analytics row, streaming the user
//! store line by line. Users are independent:
//! a user without games or playtime is skipped, a failed write is counted
//! and the run goes on.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::calculate::build_record;
use crate::models::UserDatasetRecord;
use crate::storage::{
    DatasetCsvWriter, DatasetParquetWriter, StorageConfig, StorageError, UserStore,
};

/// Errors that abort an export.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result of an export run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetReport {
    /// Users in the store
    pub total: usize,
    pub processed: usize,
    /// Rows written
    pub saved: usize,
    /// Users with no games or no playtime
    pub skipped: usize,
    pub failed: usize,
}

/// Builds the dataset file from the user store.
pub struct DatasetCreator {
    users: UserStore,
    csv: DatasetCsvWriter,
    parquet: Option<DatasetParquetWriter>,
}

impl DatasetCreator {
    pub fn new(storage: &StorageConfig, output_csv: PathBuf) -> Self {
        Self {
            users: UserStore::open(storage),
            csv: DatasetCsvWriter::new(output_csv),
            parquet: None,
        }
    }

    /// Also write a Parquet copy next to the CSV.
    pub fn with_parquet(mut self, enabled: bool) -> Self {
        self.parquet = enabled.then(|| DatasetParquetWriter::beside(self.csv.path()));
        self
    }

    /// Replace the output with rows for every stored user.
    pub fn create(&self) -> Result<DatasetReport, DatasetError> {
        info!("Creating dataset at {:?}", self.csv.path());
        self.csv.clear()?;

        let mut report = DatasetReport {
            total: self.users.count()?,
            ..Default::default()
        };
        let mut records: Vec<UserDatasetRecord> = Vec::new();
        info!("Found {} users", report.total);

        // Users are read one line at a time.
        for user in self.users.iter()? {
            report.processed += 1;
            let progress = format!("[{}/{}]", report.processed, report.total);

            if user.owned_games.is_empty() {
                report.skipped += 1;
                debug!("{} Skipped {}: no games", progress, user.steamid);
                continue;
            }

            let Some(record) = build_record(&user) else {
                report.skipped += 1;
                debug!("{} Skipped {}: no playtime", progress, user.steamid);
                continue;
            };

            match self.csv.append_record(&record) {
                Ok(()) => {
                    report.saved += 1;
                    debug!("{} Saved {} ({})", progress, user.steamid, user.nickname());
                    if self.parquet.is_some() {
                        records.push(record);
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    error!("{} Failed to write {}: {}", progress, user.steamid, e);
                }
            }
        }

        if let Some(parquet) = &self.parquet {
            parquet.write_records(&records)?;
        }

        info!(
            "Dataset complete: {} users, {} saved, {} skipped, {} failed",
            report.total, report.saved, report.skipped, report.failed
        );
        Ok(report)
    }
}
