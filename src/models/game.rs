//! Owned game and catalog metadata models.

use std::fmt;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::null_as_default;

/// Number of top tags kept on an owned game after enrichment.
pub const TOP_TAG_LIMIT: usize = 5;

/// A game owned by a user (from GetOwnedGames, enriched with catalog data).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnedGame {
    /// Steam application id
    pub appid: u64,

    /// Display name (only present with `include_appinfo`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Total playtime in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playtime_forever: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playtime_windows_forever: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playtime_mac_forever: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playtime_linux_forever: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playtime_deck_forever: Option<u64>,

    /// Unix timestamp of the last session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtime_last_played: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_icon_url: Option<String>,

    /// Ownership estimate from the catalog, e.g. "5,000,000 .. 10,000,000"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owners: Option<String>,

    /// Genre tags as delivered by the catalog (untrimmed)
    #[serde(default, deserialize_with = "null_as_default")]
    pub genres: Vec<String>,

    /// Up to five content tags, most voted first
    #[serde(rename = "topTags", default, deserialize_with = "null_as_default")]
    pub top_tags: Vec<String>,
}

impl OwnedGame {
    /// Create a game with only an id set.
    pub fn new(appid: u64) -> Self {
        Self {
            appid,
            ..Default::default()
        }
    }

    /// Builder method to set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder method to set total playtime in minutes.
    pub fn with_playtime(mut self, minutes: u64) -> Self {
        self.playtime_forever = Some(minutes);
        self
    }

    /// Builder method to set the ownership descriptor.
    pub fn with_owners(mut self, owners: impl Into<String>) -> Self {
        self.owners = Some(owners.into());
        self
    }

    /// Builder method to set genres.
    pub fn with_genres(mut self, genres: &[&str]) -> Self {
        self.genres = genres.iter().map(|g| g.to_string()).collect();
        self
    }

    /// Builder method to set top tags.
    pub fn with_top_tags(mut self, tags: &[&str]) -> Self {
        self.top_tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Playtime in minutes, absent counts as zero.
    pub fn playtime_minutes(&self) -> u64 {
        self.playtime_forever.unwrap_or(0)
    }

    /// Name for display, falling back to `App <id>`.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("App {}", self.appid),
        }
    }

    /// Trimmed genres with blank entries removed.
    pub fn trimmed_genres(&self) -> impl Iterator<Item = &str> {
        self.genres.iter().map(|g| g.trim()).filter(|g| !g.is_empty())
    }

    /// Whether any trimmed genre equals `genre` exactly.
    pub fn has_genre(&self, genre: &str) -> bool {
        self.trimmed_genres().any(|g| g == genre)
    }

    /// Merge catalog metadata into this game.
    ///
    /// Genres are split on commas and kept untrimmed; tags are ranked by
    /// vote count (ties keep catalog order) and cut to [`TOP_TAG_LIMIT`].
    pub fn enrich(&mut self, details: &GameDetails) {
        self.genres = details
            .genre
            .as_deref()
            .map(|g| g.split(',').map(str::to_string).collect())
            .unwrap_or_default();
        self.owners = details.owners.clone();
        self.top_tags = details.tags.top(TOP_TAG_LIMIT);
        if self.name.is_none() {
            self.name = details.name.clone();
        }
    }
}

/// Full catalog record for a game (SteamSpy `appdetails`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameDetails {
    pub appid: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_rank: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positive: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userscore: Option<f64>,

    /// Ownership estimate, e.g. "20,000 .. 50,000"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owners: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_forever: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median_forever: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initialprice: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ccu: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<String>,

    /// Comma-separated genre list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,

    /// Community tags with vote counts
    #[serde(default)]
    pub tags: TagVotes,
}

/// Tag vote counts in catalog order.
///
/// The catalog sends an object (`{"RPG": 1200}`) or, for games without
/// tags, an empty array. Both decode; arrays always decode as empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagVotes(pub Vec<(String, u64)>);

impl TagVotes {
    /// The `limit` most voted tags; ties keep catalog order.
    pub fn top(&self, limit: usize) -> Vec<String> {
        let mut ranked: Vec<&(String, u64)> = self.0.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
            .into_iter()
            .take(limit)
            .map(|(tag, _)| tag.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for TagVotes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (tag, votes) in &self.0 {
            map.serialize_entry(tag, votes)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TagVotes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TagVotesVisitor;

        impl<'de> Visitor<'de> for TagVotesVisitor {
            type Value = TagVotes;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of tag votes or an empty array")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<TagVotes, M::Error> {
                let mut entries = Vec::new();
                while let Some((tag, votes)) = access.next_entry::<String, u64>()? {
                    entries.push((tag, votes));
                }
                Ok(TagVotes(entries))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<TagVotes, A::Error> {
                while access.next_element::<serde::de::IgnoredAny>()?.is_some() {}
                Ok(TagVotes::default())
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<TagVotes, E> {
                Ok(TagVotes::default())
            }

            fn visit_none<E: serde::de::Error>(self) -> Result<TagVotes, E> {
                Ok(TagVotes::default())
            }
        }

        deserializer.deserialize_any(TagVotesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playtime_defaults_to_zero() {
        let game = OwnedGame::new(10);
        assert_eq!(game.playtime_minutes(), 0);
        assert_eq!(game.with_playtime(90).playtime_minutes(), 90);
    }

    #[test]
    fn test_display_name_fallback() {
        assert_eq!(OwnedGame::new(620).display_name(), "App 620");
        assert_eq!(
            OwnedGame::new(620).with_name("Portal 2").display_name(),
            "Portal 2"
        );
    }

    #[test]
    fn test_trimmed_genres_skip_blank() {
        let game = OwnedGame::new(1).with_genres(&["Action", " Indie", "  ", ""]);
        let genres: Vec<&str> = game.trimmed_genres().collect();
        assert_eq!(genres, vec!["Action", "Indie"]);
        assert!(game.has_genre("Indie"));
        assert!(!game.has_genre("indie"));
    }

    #[test]
    fn test_deserialize_api_game_without_enrichment() {
        let json = r#"{"appid":620,"name":"Portal 2","playtime_forever":754,"img_icon_url":"abc"}"#;
        let game: OwnedGame = serde_json::from_str(json).unwrap();

        assert_eq!(game.appid, 620);
        assert_eq!(game.playtime_minutes(), 754);
        assert!(game.genres.is_empty());
        assert!(game.top_tags.is_empty());
    }

    #[test]
    fn test_deserialize_null_collections() {
        let json = r#"{"appid":1,"genres":null,"topTags":null}"#;
        let game: OwnedGame = serde_json::from_str(json).unwrap();
        assert!(game.genres.is_empty());
        assert!(game.top_tags.is_empty());
    }

    #[test]
    fn test_tag_votes_from_object_keeps_order() {
        let json = r#"{"appid":620,"tags":{"Puzzle":500,"Co-op":300,"Funny":500}}"#;
        let details: GameDetails = serde_json::from_str(json).unwrap();

        assert_eq!(details.tags.0.len(), 3);
        assert_eq!(details.tags.0[0].0, "Puzzle");
        assert_eq!(details.tags.top(2), vec!["Puzzle", "Funny"]);
    }

    #[test]
    fn test_tag_votes_from_empty_array() {
        let json = r#"{"appid":999,"tags":[]}"#;
        let details: GameDetails = serde_json::from_str(json).unwrap();
        assert!(details.tags.is_empty());
    }

    #[test]
    fn test_enrich_from_details() {
        let details = GameDetails {
            appid: 620,
            name: Some("Portal 2".to_string()),
            owners: Some("20,000,000 .. 50,000,000".to_string()),
            genre: Some("Action, Adventure".to_string()),
            tags: TagVotes(vec![
                ("Puzzle".to_string(), 10),
                ("Co-op".to_string(), 9),
                ("First-Person".to_string(), 8),
                ("Sci-fi".to_string(), 7),
                ("Comedy".to_string(), 6),
                ("Singleplayer".to_string(), 5),
            ]),
            ..Default::default()
        };

        let mut game = OwnedGame::new(620).with_playtime(100);
        game.enrich(&details);

        assert_eq!(game.genres, vec!["Action", " Adventure"]);
        assert_eq!(game.owners.as_deref(), Some("20,000,000 .. 50,000,000"));
        assert_eq!(game.top_tags.len(), TOP_TAG_LIMIT);
        assert_eq!(game.top_tags[0], "Puzzle");
        assert_eq!(game.name.as_deref(), Some("Portal 2"));
    }

    #[test]
    fn test_game_serialization_uses_top_tags_key() {
        let game = OwnedGame::new(5).with_top_tags(&["RPG"]);
        let json = serde_json::to_string(&game).unwrap();
        assert!(json.contains("\"topTags\":[\"RPG\"]"));

        let parsed: OwnedGame = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, game);
    }
}
