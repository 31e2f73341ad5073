//! # Steam Dataset
//!
//! Builds a per-user play-behavior dataset from public Steam libraries.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (users, games, analytics records)
//! - **calculate**: The analytics engine (hours, genres, tags, scale tiers)
//! - **fetch**: Steam Web API, SteamSpy and community page access
//! - **storage**: Filesystem storage (JSONL stores, CSV, Parquet)
//! - **collect**: Steam ids to stored, enriched users
//! - **dataset**: Stored users to the dataset file
//! - **scrape**: Community group members to steam ids
//! - **config**: Configuration loading and validation

pub mod calculate;
pub mod collect;
pub mod config;
pub mod dataset;
pub mod fetch;
pub mod models;
pub mod scrape;
pub mod storage;

pub use models::*;
