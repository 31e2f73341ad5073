//! Collection pipeline.
//!
//! Reads steam ids from CSV, keeps public profiles, pulls each library,
//! enriches games from the catalog cache and stores the user:
//! 1. Read ids in batches
//! 2. Fetch player summaries per batch and filter
//! 3. Fetch owned games per user, enrich, store (append for new users,
//!    rewrite only when replacing a stored one)
//! 4. Pause between users

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::fetch::{FetchError, SteamApi};
use crate::models::{GameDetails, OwnedGame, SteamUser};
use crate::storage::{GameStore, SteamIdReader, StorageConfig, StorageError, UserStore};

/// Errors that abort a collection run.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Inputs of a collection run.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub steam_ids_csv: PathBuf,
    pub batch_size: usize,
    pub id_column: usize,
    pub has_header: bool,
    /// Pause after each processed user
    pub request_delay: Duration,
}

impl CollectOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            steam_ids_csv: config.collect.steam_ids_csv.clone(),
            batch_size: config.collect.batch_size,
            id_column: config.collect.id_column,
            has_header: config.collect.has_header,
            request_delay: Duration::from_millis(config.steam.request_delay_ms),
        }
    }
}

/// Result of a collection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectReport {
    /// Ids read from the CSV
    pub processed: usize,
    /// Profiles that were public and configured
    pub valid_users: usize,
    /// Users stored with a non-empty library
    pub saved_users: usize,
    /// Users (or whole batches) lost to errors
    pub failed: usize,
}

/// Outcome for one user.
enum UserOutcome {
    Saved,
    NoGames,
}

/// Drives the collection pipeline against a [`SteamApi`].
pub struct Collector<A: SteamApi> {
    api: A,
    users: UserStore,
    games: GameStore,
    options: CollectOptions,
    catalog: HashMap<u64, GameDetails>,
    /// Steam ids already in the user store
    stored: HashSet<String>,
}

impl<A: SteamApi> Collector<A> {
    pub fn new(api: A, storage: &StorageConfig, options: CollectOptions) -> Self {
        Self {
            api,
            users: UserStore::open(storage),
            games: GameStore::open(storage),
            options,
            catalog: HashMap::new(),
            stored: HashSet::new(),
        }
    }

    /// Run the whole pipeline over the configured id file.
    pub async fn run(&mut self) -> Result<CollectReport, CollectError> {
        let start = Instant::now();
        let batches = SteamIdReader::new(self.options.steam_ids_csv.clone())
            .with_column(self.options.id_column)
            .with_header(self.options.has_header)
            .batches(self.options.batch_size)?;

        self.catalog = self
            .games
            .all()?
            .into_iter()
            .map(|details| (details.appid, details))
            .collect();
        self.stored = self.users.keys()?.into_iter().collect();
        info!(
            "Starting collection: {} batches, {} cached catalog entries, {} stored users",
            batches.len(),
            self.catalog.len(),
            self.stored.len()
        );

        let mut report = CollectReport::default();
        for batch in &batches {
            self.process_batch(batch, &mut report).await;
            info!(
                "Progress: {} processed, {} valid, {} saved",
                report.processed, report.valid_users, report.saved_users
            );
        }

        info!(
            "Collection complete in {:?}: {} processed, {} saved, {} failed",
            start.elapsed(),
            report.processed,
            report.saved_users,
            report.failed
        );
        Ok(report)
    }

    /// Process one batch of ids. Errors are logged and counted.
    pub async fn process_batch(&mut self, steam_ids: &[String], report: &mut CollectReport) {
        info!("Processing batch of {} steam ids", steam_ids.len());
        report.processed += steam_ids.len();

        let users = match self.valid_users(steam_ids).await {
            Ok(users) => users,
            Err(e) => {
                error!("Failed to fetch player summaries: {}", e);
                report.failed += steam_ids.len();
                return;
            }
        };
        info!("Valid users after filtering: {}", users.len());
        report.valid_users += users.len();

        for user in users {
            let steamid = user.steamid.clone();
            match self.process_user(user).await {
                Ok(UserOutcome::Saved) => report.saved_users += 1,
                Ok(UserOutcome::NoGames) => debug!("User {} has no games, skipping", steamid),
                Err(e) => {
                    error!("Failed to process user {}: {}", steamid, e);
                    report.failed += 1;
                }
            }

            if !self.options.request_delay.is_zero() {
                tokio::time::sleep(self.options.request_delay).await;
            }
        }
    }

    async fn valid_users(&self, steam_ids: &[String]) -> Result<Vec<SteamUser>, FetchError> {
        let players = self.api.player_summaries(steam_ids).await?;
        Ok(players
            .into_iter()
            .filter(SteamUser::is_public_profile)
            .collect())
    }

    async fn process_user(&mut self, mut user: SteamUser) -> Result<UserOutcome, CollectError> {
        info!("Processing user {} ({})", user.steamid, user.nickname());

        let Some(mut games) = self.api.owned_games(&user.steamid).await?.into_games() else {
            return Ok(UserOutcome::NoGames);
        };
        debug!("Found {} games", games.len());

        for game in &mut games {
            self.enrich(game).await?;
        }

        user.owned_games = games;
        if self.stored.contains(&user.steamid) {
            self.users.upsert(user)?;
        } else {
            self.users.append(&user)?;
            self.stored.insert(user.steamid);
        }
        Ok(UserOutcome::Saved)
    }

    /// Enrich a game from the catalog cache, fetching and caching on a miss.
    /// A failed fetch leaves the game as it is.
    async fn enrich(&mut self, game: &mut OwnedGame) -> Result<(), CollectError> {
        if let Some(details) = self.catalog.get(&game.appid) {
            game.enrich(details);
            return Ok(());
        }

        let details = match self.api.game_details(game.appid).await {
            Ok(details) => details,
            Err(e) => {
                warn!("No catalog details for app {}: {}", game.appid, e);
                return Ok(());
            }
        };

        // Absent from the catalog map, so absent from the store.
        game.enrich(&details);
        self.games.append(&details)?;
        self.catalog.insert(details.appid, details);
        Ok(())
    }

    /// The user store this collector writes to.
    pub fn users(&self) -> &UserStore {
        &self.users
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockSteamApi;
    use crate::models::TagVotes;
    use tempfile::TempDir;

    fn public(id: &str) -> SteamUser {
        SteamUser {
            communityvisibilitystate: Some(3),
            profilestate: Some(1),
            ..SteamUser::new(id).with_personaname(format!("user{}", id))
        }
    }

    fn portal() -> GameDetails {
        GameDetails {
            appid: 620,
            name: Some("Portal 2".to_string()),
            owners: Some("20,000,000 .. 50,000,000".to_string()),
            genre: Some("Action, Adventure".to_string()),
            tags: TagVotes(vec![("Puzzle".to_string(), 900), ("Co-op".to_string(), 500)]),
            ..Default::default()
        }
    }

    fn setup(ids: &str) -> (TempDir, StorageConfig, CollectOptions) {
        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("ids.csv");
        std::fs::write(&csv, ids).unwrap();

        let storage = StorageConfig::new(dir.path().join("data"));
        let options = CollectOptions {
            steam_ids_csv: csv,
            batch_size: 2,
            id_column: 0,
            has_header: true,
            request_delay: Duration::ZERO,
        };
        (dir, storage, options)
    }

    #[tokio::test]
    async fn test_collect_filters_and_saves() {
        let (_dir, storage, options) = setup("steamid\n1\n2\n3\n4\n");

        let private = SteamUser {
            communityvisibilitystate: Some(1),
            profilestate: Some(1),
            ..SteamUser::new("2")
        };
        let api = MockSteamApi::default()
            .with_player(public("1"), vec![OwnedGame::new(620).with_playtime(90)])
            .with_player(private, vec![OwnedGame::new(620).with_playtime(10)])
            .with_player(public("3"), vec![])
            .with_details(portal());

        let mut collector = Collector::new(api, &storage, options);
        let report = collector.run().await.unwrap();

        assert_eq!(
            report,
            CollectReport {
                processed: 4,
                valid_users: 2,
                saved_users: 1,
                failed: 0,
            }
        );

        let saved = collector.users().all().unwrap();
        assert_eq!(saved.len(), 1);
        let game = &saved[0].owned_games[0];
        assert_eq!(game.genres, vec!["Action", " Adventure"]);
        assert_eq!(game.top_tags, vec!["Puzzle", "Co-op"]);
        assert_eq!(game.owners.as_deref(), Some("20,000,000 .. 50,000,000"));
    }

    #[tokio::test]
    async fn test_catalog_fetched_once_and_cached() {
        let (_dir, storage, options) = setup("steamid\n1\n2\n");

        let api = MockSteamApi::default()
            .with_player(public("1"), vec![OwnedGame::new(620).with_playtime(60)])
            .with_player(public("2"), vec![OwnedGame::new(620).with_playtime(30)])
            .with_details(portal());

        let mut collector = Collector::new(api, &storage, options.clone());
        collector.run().await.unwrap();
        assert_eq!(collector.api.detail_calls(), 1);
        assert_eq!(GameStore::open(&storage).count().unwrap(), 1);

        // A second run is served from the stored catalog.
        let api = MockSteamApi::default()
            .with_player(public("1"), vec![OwnedGame::new(620).with_playtime(60)]);
        let mut collector = Collector::new(api, &storage, options);
        collector.run().await.unwrap();
        assert_eq!(collector.api.detail_calls(), 0);

        let user = collector.users().get(&"1".to_string()).unwrap().unwrap();
        assert_eq!(user.owned_games[0].top_tags, vec!["Puzzle", "Co-op"]);
    }

    #[tokio::test]
    async fn test_missing_details_leave_game_unenriched() {
        let (_dir, storage, options) = setup("steamid\n1\n");

        let api = MockSteamApi::default()
            .with_player(public("1"), vec![OwnedGame::new(999).with_playtime(60)]);

        let mut collector = Collector::new(api, &storage, options);
        let report = collector.run().await.unwrap();

        assert_eq!(report.saved_users, 1);
        let user = collector.users().get(&"1".to_string()).unwrap().unwrap();
        assert!(user.owned_games[0].genres.is_empty());
        assert!(user.owned_games[0].owners.is_none());
    }

    #[tokio::test]
    async fn test_user_failure_is_counted() {
        let (_dir, storage, options) = setup("steamid\n1\n2\n");

        let mut api = MockSteamApi::default()
            .with_player(public("1"), vec![OwnedGame::new(620).with_playtime(60)])
            .with_player(public("2"), vec![OwnedGame::new(620).with_playtime(60)])
            .with_details(portal());
        api.failing_users.push("1".to_string());

        let mut collector = Collector::new(api, &storage, options);
        let report = collector.run().await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.saved_users, 1);
    }

    #[tokio::test]
    async fn test_rerun_upserts_users() {
        let (_dir, storage, options) = setup("steamid\n1\n2\n");

        let api = MockSteamApi::default()
            .with_player(public("1"), vec![OwnedGame::new(620).with_playtime(60)])
            .with_player(public("2"), vec![OwnedGame::new(620).with_playtime(30)])
            .with_details(portal());

        let mut collector = Collector::new(api, &storage, options.clone());
        collector.run().await.unwrap();
        collector.run().await.unwrap();

        // A fresh collector over the same ids replaces the stored libraries.
        let api = MockSteamApi::default()
            .with_player(public("1"), vec![OwnedGame::new(620).with_playtime(600)])
            .with_player(public("2"), vec![OwnedGame::new(620).with_playtime(300)]);
        let mut collector = Collector::new(api, &storage, options);
        let report = collector.run().await.unwrap();
        assert_eq!(report.saved_users, 2);

        let users = collector.users();
        let contents = std::fs::read_to_string(users.path()).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert_eq!(users.keys().unwrap(), vec!["1".to_string(), "2".to_string()]);

        let user = users.get(&"1".to_string()).unwrap().unwrap();
        assert_eq!(user.owned_games[0].playtime_minutes(), 600);
    }

    #[tokio::test]
    async fn test_catalog_misses_append_once_each() {
        let (_dir, storage, options) = setup("steamid\n1\n2\n");

        let api = MockSteamApi::default()
            .with_player(
                public("1"),
                vec![OwnedGame::new(620).with_playtime(60), OwnedGame::new(620).with_playtime(5)],
            )
            .with_player(public("2"), vec![OwnedGame::new(620).with_playtime(30)])
            .with_details(portal());

        let mut collector = Collector::new(api, &storage, options);
        collector.run().await.unwrap();

        let games = GameStore::open(&storage);
        assert_eq!(games.keys().unwrap(), vec![620]);
        assert_eq!(collector.api.detail_calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_id_file_is_fatal() {
        let (dir, storage, mut options) = setup("");
        options.steam_ids_csv = dir.path().join("missing.csv");

        let mut collector = Collector::new(MockSteamApi::default(), &storage, options);
        assert!(matches!(
            collector.run().await,
            Err(CollectError::Storage(StorageError::PathNotFound(_)))
        ));
    }
}
