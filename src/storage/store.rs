//! Keyed entity stores backed by JSONL files.
//!
//! Inserts append a line. Replacements and deletions rewrite the file
//! through [`JsonlWriter::write_all`], so a store is safe to reopen at any
//! point. Callers that insert in bulk keep their own key set (see
//! [`KeyedStore::keys`]) and use [`KeyedStore::append`] to avoid a full
//! read per insert.

use std::fmt::Display;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::{EntityType, JsonlReader, JsonlWriter, StorageConfig, StorageError};
use crate::models::{GameDetails, SteamUser};

/// An entity with a unique key.
pub trait Keyed {
    type Key: PartialEq + Clone + Display;

    /// Label used in errors and logs.
    const ENTITY: EntityType;

    fn key(&self) -> Self::Key;
}

impl Keyed for SteamUser {
    type Key = String;
    const ENTITY: EntityType = EntityType::User;

    fn key(&self) -> String {
        self.steamid.clone()
    }
}

impl Keyed for GameDetails {
    type Key = u64;
    const ENTITY: EntityType = EntityType::Game;

    fn key(&self) -> u64 {
        self.appid
    }
}

/// Create/read/update/delete over one JSONL file.
pub struct KeyedStore<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

/// Collected users, keyed by steam id.
pub type UserStore = KeyedStore<SteamUser>;

/// Catalog cache, keyed by app id.
pub type GameStore = KeyedStore<GameDetails>;

impl<T> KeyedStore<T>
where
    T: Keyed + Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Open the store for `T` under the configured data directory.
    pub fn open(config: &StorageConfig) -> Self {
        Self::new(config.entity_path(T::ENTITY))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reader(&self) -> JsonlReader<T> {
        JsonlReader::new(self.path.clone())
    }

    fn writer(&self) -> JsonlWriter<T> {
        JsonlWriter::new(self.path.clone())
    }

    fn duplicate(key: &T::Key) -> StorageError {
        StorageError::Duplicate {
            entity: T::ENTITY.label(),
            key: key.to_string(),
        }
    }

    /// Insert a new entity. Fails if the key already exists.
    pub fn create(&self, entity: T) -> Result<T, StorageError> {
        let key = entity.key();
        if self.get(&key)?.is_some() {
            return Err(Self::duplicate(&key));
        }

        self.writer().append(&entity)?;
        debug!("Created {} {}", T::ENTITY.label(), key);
        Ok(entity)
    }

    /// Insert many entities, skipping keys that already exist (in the store
    /// or earlier in `entities`). Returns how many were inserted.
    pub fn create_many(&self, entities: Vec<T>) -> Result<usize, StorageError> {
        let mut keys = self.keys()?;
        let mut fresh = Vec::with_capacity(entities.len());

        for entity in entities {
            let key = entity.key();
            if keys.contains(&key) {
                warn!("Skipping duplicate {} {}", T::ENTITY.label(), key);
                continue;
            }
            keys.push(key);
            fresh.push(entity);
        }

        self.writer().append_batch(&fresh)
    }

    /// Append without a duplicate check. The caller must already know the
    /// key is absent.
    pub fn append(&self, entity: &T) -> Result<(), StorageError> {
        self.writer().append(entity)?;
        debug!("Appended {} {}", T::ENTITY.label(), entity.key());
        Ok(())
    }

    pub fn get(&self, key: &T::Key) -> Result<Option<T>, StorageError> {
        Ok(self.iter()?.find(|e| &e.key() == key))
    }

    /// Stream stored entities one line at a time. Unreadable lines are
    /// skipped with a warning; a missing file yields nothing.
    pub fn iter(&self) -> Result<impl Iterator<Item = T>, StorageError> {
        let reader = self.reader();
        let entries = if reader.exists() {
            Some(reader.iter()?)
        } else {
            None
        };

        let path = self.path.clone();
        Ok(entries
            .into_iter()
            .flatten()
            .filter_map(move |entry| match entry {
                Ok(entity) => Some(entity),
                Err(e) => {
                    warn!("Skipping unreadable {} in {:?}: {}", T::ENTITY.label(), path, e);
                    None
                }
            }))
    }

    /// Keys of every stored entity, in file order.
    pub fn keys(&self) -> Result<Vec<T::Key>, StorageError> {
        Ok(self.iter()?.map(|e| e.key()).collect())
    }

    /// Entities matching a predicate.
    pub fn find<F>(&self, predicate: F) -> Result<Vec<T>, StorageError>
    where
        F: Fn(&T) -> bool,
    {
        self.reader().read_where(predicate)
    }

    pub fn all(&self) -> Result<Vec<T>, StorageError> {
        self.reader().read_all()
    }

    /// Apply `change` to the entity with `key`. Returns false if absent.
    pub fn update<F>(&self, key: &T::Key, change: F) -> Result<bool, StorageError>
    where
        F: FnOnce(&mut T),
    {
        let mut entities = self.all()?;
        let Some(entity) = entities.iter_mut().find(|e| &e.key() == key) else {
            return Ok(false);
        };

        change(entity);
        self.writer().write_all(&entities)?;
        Ok(true)
    }

    /// Replace the entity with the same key, or insert it.
    pub fn upsert(&self, entity: T) -> Result<(), StorageError> {
        let key = entity.key();
        let mut entities = self.all()?;

        match entities.iter_mut().find(|e| e.key() == key) {
            Some(existing) => {
                *existing = entity;
                self.writer().write_all(&entities)?;
                debug!("Updated {} {}", T::ENTITY.label(), key);
            }
            None => {
                self.writer().append(&entity)?;
                debug!("Inserted {} {}", T::ENTITY.label(), key);
            }
        }

        Ok(())
    }

    /// Remove the entity with `key`. Returns false if absent.
    pub fn delete(&self, key: &T::Key) -> Result<bool, StorageError> {
        let mut entities = self.all()?;
        let before = entities.len();
        entities.retain(|e| &e.key() != key);

        if entities.len() == before {
            return Ok(false);
        }

        self.writer().write_all(&entities)?;
        Ok(true)
    }

    /// Remove everything. Returns how many entities were removed.
    pub fn delete_all(&self) -> Result<usize, StorageError> {
        let removed = self.count()?;
        self.writer().write_all(&[])?;
        Ok(removed)
    }

    pub fn count(&self) -> Result<usize, StorageError> {
        self.reader().count()
    }
}
