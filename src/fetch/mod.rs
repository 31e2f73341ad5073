//! HTTP access to the Steam Web API, SteamSpy and community pages.
//!
//! Everything network-facing sits behind two traits so the pipelines can be
//! driven by in-memory fakes in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::SteamConfig;
use crate::models::{GameDetails, OwnedGamesResponse, PlayerSummariesResponse, SteamUser};

/// Errors that can occur during fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Rate limited by {host}, retry after {retry_after_secs}s")]
    RateLimited { host: String, retry_after_secs: u64 },

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FetchError {
    /// Rate limiting, server errors and transport failures are worth
    /// another attempt. Client errors and bad payloads are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::RateLimited { .. } => true,
            FetchError::HttpStatus { status, .. } => *status >= 500,
            FetchError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            FetchError::InvalidUrl(_) | FetchError::Json(_) => false,
        }
    }
}

impl From<url::ParseError> for FetchError {
    fn from(e: url::ParseError) -> Self {
        FetchError::InvalidUrl(e.to_string())
    }
}

/// Retry policy for network calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis((self.initial_delay_ms as f64 * factor) as u64)
    }

    /// Wait before retrying after `error`. Rate limits honor the server's
    /// `Retry-After` when it asks for longer than the backoff.
    pub fn delay_after(&self, error: &FetchError, attempt: u32) -> Duration {
        let backoff = self.delay_for(attempt);
        match error {
            FetchError::RateLimited {
                retry_after_secs, ..
            } => backoff.max(Duration::from_secs(*retry_after_secs)),
            _ => backoff,
        }
    }
}

/// Steam data sources used by the collector.
#[async_trait]
pub trait SteamApi: Send + Sync {
    /// Profiles for up to 100 ids.
    async fn player_summaries(&self, steam_ids: &[String]) -> Result<Vec<SteamUser>, FetchError>;

    /// The user's library with app info.
    async fn owned_games(&self, steam_id: &str) -> Result<OwnedGamesResponse, FetchError>;

    /// Catalog metadata for one app.
    async fn game_details(&self, appid: u64) -> Result<GameDetails, FetchError>;
}

/// Plain page download, used by the group scraper.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// `reqwest`-backed client for the Steam Web API and SteamSpy.
pub struct SteamClient {
    client: Client,
    api_key: String,
    api_base_url: String,
    steamspy_url: String,
    retry: RetryPolicy,
}

impl SteamClient {
    pub fn new(config: &SteamConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("steam-dataset/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            steamspy_url: config.steamspy_url.clone(),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                ..RetryPolicy::default()
            },
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn player_summaries_url(&self, steam_ids: &[String]) -> Result<Url, FetchError> {
        let mut url = Url::parse(&format!(
            "{}/ISteamUser/GetPlayerSummaries/v0002/",
            self.api_base_url
        ))?;
        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("steamids", &steam_ids.join(","))
            .append_pair("format", "json");
        Ok(url)
    }

    fn owned_games_url(&self, steam_id: &str) -> Result<Url, FetchError> {
        let mut url = Url::parse(&format!(
            "{}/IPlayerService/GetOwnedGames/v0001/",
            self.api_base_url
        ))?;
        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("steamid", steam_id)
            .append_pair("include_appinfo", "1")
            .append_pair("format", "json");
        Ok(url)
    }

    fn game_details_url(&self, appid: u64) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.steamspy_url)?;
        url.query_pairs_mut()
            .append_pair("request", "appdetails")
            .append_pair("appid", &appid.to_string());
        Ok(url)
    }

    /// One GET, mapping 429 and other non-2xx statuses to errors.
    async fn get_once(&self, url: &Url) -> Result<String, FetchError> {
        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(FetchError::RateLimited {
                host: url.host_str().unwrap_or("unknown").to_string(),
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        Ok(response.text().await?)
    }

    /// GET with retries on retryable errors.
    async fn get(&self, url: &Url) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            match self.get_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    let wait = self.retry.delay_after(&e, attempt);
                    warn!(
                        "Request to {} failed ({}), retry {} in {:?}",
                        url.host_str().unwrap_or("unknown"),
                        e,
                        attempt + 1,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, FetchError> {
        let body = self.get(url).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl SteamApi for SteamClient {
    async fn player_summaries(&self, steam_ids: &[String]) -> Result<Vec<SteamUser>, FetchError> {
        if steam_ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.player_summaries_url(steam_ids)?;
        let summaries: PlayerSummariesResponse = self.get_json(&url).await?;
        info!(
            "Fetched {} of {} player summaries",
            summaries.response.players.len(),
            steam_ids.len()
        );
        Ok(summaries.response.players)
    }

    async fn owned_games(&self, steam_id: &str) -> Result<OwnedGamesResponse, FetchError> {
        let url = self.owned_games_url(steam_id)?;
        debug!("Fetching owned games for {}", steam_id);
        self.get_json(&url).await
    }

    async fn game_details(&self, appid: u64) -> Result<GameDetails, FetchError> {
        let url = self.game_details_url(appid)?;
        debug!("Fetching catalog details for app {}", appid);
        let mut details: GameDetails = self.get_json(&url).await?;
        // Unknown apps come back with appid 0.
        details.appid = appid;
        Ok(details)
    }
}

#[async_trait]
impl PageFetcher for SteamClient {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let url = Url::parse(url)?;
        info!("Fetching {}", url);
        self.get(&url).await
    }
}

/// In-memory Steam data for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MockSteamApi {
    pub players: Vec<SteamUser>,
    pub libraries: std::collections::HashMap<String, OwnedGamesResponse>,
    pub details: std::collections::HashMap<u64, GameDetails>,
    pub failing_users: Vec<String>,
    pub pages: std::collections::HashMap<String, String>,
    pub detail_calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockSteamApi {
    pub fn with_player(mut self, user: SteamUser, games: Vec<crate::models::OwnedGame>) -> Self {
        let response = OwnedGamesResponse {
            response: crate::models::OwnedGames {
                game_count: Some(games.len() as u32),
                games,
            },
        };
        self.libraries.insert(user.steamid.clone(), response);
        self.players.push(user);
        self
    }

    pub fn with_details(mut self, details: GameDetails) -> Self {
        self.details.insert(details.appid, details);
        self
    }

    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl SteamApi for MockSteamApi {
    async fn player_summaries(&self, steam_ids: &[String]) -> Result<Vec<SteamUser>, FetchError> {
        Ok(self
            .players
            .iter()
            .filter(|p| steam_ids.contains(&p.steamid))
            .cloned()
            .collect())
    }

    async fn owned_games(&self, steam_id: &str) -> Result<OwnedGamesResponse, FetchError> {
        if self.failing_users.iter().any(|id| id == steam_id) {
            return Err(FetchError::HttpStatus {
                status: 500,
                message: "Internal Server Error".to_string(),
            });
        }
        Ok(self.libraries.get(steam_id).cloned().unwrap_or_default())
    }

    async fn game_details(&self, appid: u64) -> Result<GameDetails, FetchError> {
        self.detail_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.details
            .get(&appid)
            .cloned()
            .ok_or_else(|| FetchError::HttpStatus {
                status: 404,
                message: "Not Found".to_string(),
            })
    }
}

#[cfg(test)]
#[async_trait]
impl PageFetcher for MockSteamApi {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::HttpStatus {
                status: 404,
                message: "Not Found".to_string(),
            })
    }
}
