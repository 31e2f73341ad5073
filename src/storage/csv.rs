//! Plain CSV input and output.
//!
//! Input is a list of steam ids, one per row. Output is the dataset table,
//! one row per user, with collections embedded as quoted JSON.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use super::StorageError;
use crate::models::{ScaleTier, UserDatasetRecord};

/// Dataset header, in column order.
pub const DATASET_COLUMNS: [&str; 19] = [
    "user_id",
    "nickname",
    "loccountrycode",
    "total_playtime",
    "game_count_nonzero",
    "average_playtime",
    "median_playtime",
    "top_5_games",
    "top_5_playtimes",
    "favorite_scale",
    "scale_indie_count",
    "scale_aa_count",
    "scale_aaa_count",
    "favorite_genre_by_time",
    "favorite_genre_by_count",
    "genre_shannon_index",
    "genre_distribution",
    "favorite_tags",
    "tag_weights",
];

/// Reads steam ids from one column of a CSV file.
#[derive(Debug, Clone)]
pub struct SteamIdReader {
    path: PathBuf,
    column: usize,
    has_header: bool,
}

impl SteamIdReader {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            column: 0,
            has_header: true,
        }
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = column;
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// All ids in file order. Cells are trimmed; rows with an empty or
    /// missing cell are skipped.
    pub fn read_all(&self) -> Result<Vec<String>, StorageError> {
        if !self.path.exists() {
            return Err(StorageError::PathNotFound(self.path.clone()));
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let skip = usize::from(self.has_header);
        let mut ids = Vec::new();

        for line in reader.lines().skip(skip) {
            let line = line?;
            if let Some(id) = line
                .split(',')
                .nth(self.column)
                .map(str::trim)
                .filter(|id| !id.is_empty())
            {
                ids.push(id.to_string());
            }
        }

        debug!("Read {} steam ids from {:?}", ids.len(), self.path);
        Ok(ids)
    }

    /// Ids grouped into batches of at most `size` (the last may be shorter).
    pub fn batches(&self, size: usize) -> Result<Vec<Vec<String>>, StorageError> {
        let size = size.max(1);
        Ok(self
            .read_all()?
            .chunks(size)
            .map(<[String]>::to_vec)
            .collect())
    }
}

/// Writes dataset records as CSV rows.
pub struct DatasetCsvWriter {
    path: PathBuf,
}

impl DatasetCsvWriter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Remove the output file if present.
    pub fn clear(&self) -> Result<(), StorageError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            debug!("Removed {:?}", self.path);
        }
        Ok(())
    }

    /// Append one record, writing the header first if the file is new.
    pub fn append_record(&self, record: &UserDatasetRecord) -> Result<(), StorageError> {
        self.append_records(std::slice::from_ref(record)).map(|_| ())
    }

    /// Append records in order. Returns how many rows were written.
    pub fn append_records(&self, records: &[UserDatasetRecord]) -> Result<usize, StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let needs_header = fs::metadata(&self.path).map_or(true, |m| m.len() == 0);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);

        if needs_header {
            writeln!(writer, "{}", DATASET_COLUMNS.join(","))?;
        }

        for record in records {
            writeln!(writer, "{}", Self::row(record)?.join(","))?;
        }

        writer.flush()?;
        if records.len() > 1 {
            info!("Appended {} rows to {:?}", records.len(), self.path);
        }
        Ok(records.len())
    }

    /// Cells of one record, already escaped.
    pub fn row(record: &UserDatasetRecord) -> Result<Vec<String>, StorageError> {
        let scale = &record.scale_distribution;
        Ok(vec![
            escape(&record.user_id),
            escape(&record.nickname),
            escape(&record.loccountrycode),
            record.total_playtime.to_string(),
            record.game_count_nonzero.to_string(),
            record.average_playtime.to_string(),
            record.median_playtime.to_string(),
            json_cell(&record.top_5_games)?,
            json_cell(&record.top_5_playtimes)?,
            escape(record.favorite_scale.as_str()),
            scale.get(ScaleTier::Indie).to_string(),
            scale.get(ScaleTier::DoubleA).to_string(),
            scale.get(ScaleTier::TripleA).to_string(),
            escape(&record.favorite_genre_by_time),
            escape(&record.favorite_genre_by_count),
            record.genre_shannon_index.to_string(),
            json_cell(&record.genre_distribution)?,
            json_cell(&record.favorite_tags)?,
            json_cell(&record.tag_weights)?,
        ])
    }
}

/// Quote a value if it contains a comma, quote or newline.
pub fn escape(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        quote(value)
    } else {
        value.to_string()
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Collections are always quoted JSON.
fn json_cell<T: Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
    Ok(quote(&serde_json::to_string(value)?))
}

/// Append one line of text, creating the file and its directory if needed.
pub fn append_line(path: &Path, text: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", text)?;
    Ok(())
}
