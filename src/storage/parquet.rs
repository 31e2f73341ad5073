//! Parquet copy of the dataset.
//!
//! Same columns as the CSV export, for analysis tools that prefer a typed
//! columnar file. Collections are stored as JSON strings.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray, UInt32Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use tracing::{debug, info};

use super::StorageError;
use crate::models::{ScaleTier, UserDatasetRecord};

/// Schema definitions for Parquet tables.
pub mod schemas {
    use super::*;

    /// Schema for the dataset table, column for column with the CSV.
    pub fn dataset_schema() -> Schema {
        Schema::new(vec![
            Field::new("user_id", DataType::Utf8, false),
            Field::new("nickname", DataType::Utf8, false),
            Field::new("loccountrycode", DataType::Utf8, false),
            Field::new("total_playtime", DataType::UInt64, false),
            Field::new("game_count_nonzero", DataType::UInt32, false),
            Field::new("average_playtime", DataType::Float64, false),
            Field::new("median_playtime", DataType::Float64, false),
            Field::new("top_5_games", DataType::Utf8, false),
            Field::new("top_5_playtimes", DataType::Utf8, false),
            Field::new("favorite_scale", DataType::Utf8, false),
            Field::new("scale_indie_count", DataType::UInt32, false),
            Field::new("scale_aa_count", DataType::UInt32, false),
            Field::new("scale_aaa_count", DataType::UInt32, false),
            Field::new("favorite_genre_by_time", DataType::Utf8, false),
            Field::new("favorite_genre_by_count", DataType::Utf8, false),
            Field::new("genre_shannon_index", DataType::Float64, false),
            Field::new("genre_distribution", DataType::Utf8, false),
            Field::new("favorite_tags", DataType::Utf8, false),
            Field::new("tag_weights", DataType::Utf8, false),
        ])
    }
}

fn parquet_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::Parquet(e.to_string())
}

/// One JSON string per record for a collection field.
fn json_column<T, F>(records: &[UserDatasetRecord], field: F) -> Result<ArrayRef, StorageError>
where
    T: Serialize + ?Sized,
    F: Fn(&UserDatasetRecord) -> &T,
{
    let values = records
        .iter()
        .map(|r| serde_json::to_string(field(r)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Arc::new(StringArray::from(values)) as ArrayRef)
}

fn string_column<'a, F>(records: &'a [UserDatasetRecord], field: F) -> ArrayRef
where
    F: Fn(&'a UserDatasetRecord) -> &'a str,
{
    let values: Vec<&str> = records.iter().map(field).collect();
    Arc::new(StringArray::from(values)) as ArrayRef
}

fn scale_column(records: &[UserDatasetRecord], tier: ScaleTier) -> ArrayRef {
    let values: Vec<u32> = records
        .iter()
        .map(|r| r.scale_distribution.get(tier))
        .collect();
    Arc::new(UInt32Array::from(values)) as ArrayRef
}

/// Writes dataset records to a single Parquet file.
pub struct DatasetParquetWriter {
    path: PathBuf,
}

impl DatasetParquetWriter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Writer for the `.parquet` sibling of a CSV export.
    pub fn beside(csv_path: &Path) -> Self {
        Self::new(csv_path.with_extension("parquet"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write all records, replacing any existing file.
    pub fn write_records(&self, records: &[UserDatasetRecord]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let schema = Arc::new(schemas::dataset_schema());
        let batch = Self::to_batch(&schema, records)?;
        self.write_batch(&schema, &batch)?;

        info!("Wrote {} records to {:?}", records.len(), self.path);
        Ok(())
    }

    fn to_batch(
        schema: &Arc<Schema>,
        records: &[UserDatasetRecord],
    ) -> Result<RecordBatch, StorageError> {
        let total_playtimes: Vec<u64> = records.iter().map(|r| r.total_playtime).collect();
        let game_counts: Vec<u32> = records.iter().map(|r| r.game_count_nonzero).collect();
        let averages: Vec<f64> = records.iter().map(|r| r.average_playtime).collect();
        let medians: Vec<f64> = records.iter().map(|r| r.median_playtime).collect();
        let shannon: Vec<f64> = records.iter().map(|r| r.genre_shannon_index).collect();

        RecordBatch::try_new(
            schema.clone(),
            vec![
                string_column(records, |r| r.user_id.as_str()),
                string_column(records, |r| r.nickname.as_str()),
                string_column(records, |r| r.loccountrycode.as_str()),
                Arc::new(UInt64Array::from(total_playtimes)) as ArrayRef,
                Arc::new(UInt32Array::from(game_counts)) as ArrayRef,
                Arc::new(Float64Array::from(averages)) as ArrayRef,
                Arc::new(Float64Array::from(medians)) as ArrayRef,
                json_column(records, |r| &r.top_5_games)?,
                json_column(records, |r| &r.top_5_playtimes)?,
                string_column(records, |r| r.favorite_scale.as_str()),
                scale_column(records, ScaleTier::Indie),
                scale_column(records, ScaleTier::DoubleA),
                scale_column(records, ScaleTier::TripleA),
                string_column(records, |r| r.favorite_genre_by_time.as_str()),
                string_column(records, |r| r.favorite_genre_by_count.as_str()),
                Arc::new(Float64Array::from(shannon)) as ArrayRef,
                json_column(records, |r| &r.genre_distribution)?,
                json_column(records, |r| &r.favorite_tags)?,
                json_column(records, |r| &r.tag_weights)?,
            ],
        )
        .map_err(parquet_err)
    }

    /// Write a record batch to the Parquet file.
    fn write_batch(&self, schema: &Arc<Schema>, batch: &RecordBatch) -> Result<(), StorageError> {
        let file = File::create(&self.path)?;

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut writer =
            ArrowWriter::try_new(file, schema.clone(), Some(props)).map_err(parquet_err)?;
        writer.write(batch).map_err(parquet_err)?;
        writer.close().map_err(parquet_err)?;

        Ok(())
    }
}

/// Reads a dataset Parquet file back.
pub struct DatasetParquetReader {
    path: PathBuf,
}

impl DatasetParquetReader {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all record batches. A missing file reads as empty.
    pub fn read_batches(&self) -> Result<Vec<RecordBatch>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(parquet_err)?
            .build()
            .map_err(parquet_err)?;

        let batches = reader.collect::<Result<Vec<_>, _>>().map_err(parquet_err)?;

        debug!("Read {} batches from {:?}", batches.len(), self.path);
        Ok(batches)
    }

    pub fn count(&self) -> Result<usize, StorageError> {
        Ok(self.read_batches()?.iter().map(|b| b.num_rows()).sum())
    }
}
