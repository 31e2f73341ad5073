//! Steam user model (GetPlayerSummaries plus the owned-games list).

use serde::{Deserialize, Serialize};

use super::{null_as_default, OwnedGame};

/// Placeholder for missing display fields.
pub const UNKNOWN: &str = "Unknown";

/// `communityvisibilitystate` value of a public profile.
pub const VISIBILITY_PUBLIC: u32 = 3;

/// A Steam user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SteamUser {
    /// 64-bit Steam id as a decimal string
    pub steamid: String,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personaname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profileurl: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realname: Option<String>,

    /// ISO country code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loccountrycode: Option<String>,

    /// 1 = private, 3 = public
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communityvisibilitystate: Option<u32>,

    /// 1 once the community profile is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profilestate: Option<u32>,

    /// Unix timestamp of account creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timecreated: Option<i64>,

    /// Owned games, enriched with catalog data
    #[serde(rename = "ownedGames", default, deserialize_with = "null_as_default")]
    pub owned_games: Vec<OwnedGame>,
}

impl SteamUser {
    /// Create a user with only an id set.
    pub fn new(steamid: impl Into<String>) -> Self {
        Self {
            steamid: steamid.into(),
            ..Default::default()
        }
    }

    /// Builder method to set the display name.
    pub fn with_personaname(mut self, name: impl Into<String>) -> Self {
        self.personaname = Some(name.into());
        self
    }

    /// Builder method to set the country code.
    pub fn with_country(mut self, code: impl Into<String>) -> Self {
        self.loccountrycode = Some(code.into());
        self
    }

    /// Builder method to set owned games.
    pub fn with_games(mut self, games: Vec<OwnedGame>) -> Self {
        self.owned_games = games;
        self
    }

    /// Display name, or "Unknown".
    pub fn nickname(&self) -> &str {
        self.personaname.as_deref().unwrap_or(UNKNOWN)
    }

    /// Country code, or "Unknown".
    pub fn country_code(&self) -> &str {
        self.loccountrycode.as_deref().unwrap_or(UNKNOWN)
    }

    /// Public and configured profile, so owned games are readable.
    pub fn is_public_profile(&self) -> bool {
        self.communityvisibilitystate == Some(VISIBILITY_PUBLIC) && self.profilestate == Some(1)
    }
}
