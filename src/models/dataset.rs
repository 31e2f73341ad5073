//! Per-user analytics record and production-scale tiers.

use serde::{Deserialize, Serialize};

use super::Tally;

/// Production-scale tier of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScaleTier {
    #[serde(rename = "Indie")]
    Indie,
    #[serde(rename = "AA")]
    DoubleA,
    #[serde(rename = "AAA")]
    TripleA,
}

impl ScaleTier {
    /// All tiers, smallest first. This is also the tie-break order.
    pub const ALL: [ScaleTier; 3] = [ScaleTier::Indie, ScaleTier::DoubleA, ScaleTier::TripleA];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleTier::Indie => "Indie",
            ScaleTier::DoubleA => "AA",
            ScaleTier::TripleA => "AAA",
        }
    }
}

impl std::fmt::Display for ScaleTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Number of games per scale tier. Every tier is always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleDistribution {
    #[serde(rename = "Indie")]
    pub indie: u32,
    #[serde(rename = "AA")]
    pub aa: u32,
    #[serde(rename = "AAA")]
    pub aaa: u32,
}

impl ScaleDistribution {
    pub fn get(&self, tier: ScaleTier) -> u32 {
        match tier {
            ScaleTier::Indie => self.indie,
            ScaleTier::DoubleA => self.aa,
            ScaleTier::TripleA => self.aaa,
        }
    }

    pub fn total(&self) -> u32 {
        self.indie + self.aa + self.aaa
    }
}

impl From<&Tally<ScaleTier, u32>> for ScaleDistribution {
    fn from(tally: &Tally<ScaleTier, u32>) -> Self {
        let count = |tier| tally.get(&tier).copied().unwrap_or(0);
        Self {
            indie: count(ScaleTier::Indie),
            aa: count(ScaleTier::DoubleA),
            aaa: count(ScaleTier::TripleA),
        }
    }
}

/// Derived play-behavior profile of one user.
///
/// Built once from the user's owned games and never mutated. Hours are
/// whole hours rounded half away from zero; see `calculate::record`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDatasetRecord {
    /// Steam id of the source user
    pub user_id: String,

    /// Display name ("Unknown" if absent)
    pub nickname: String,

    /// Country code ("Unknown" if absent)
    pub loccountrycode: String,

    /// Sum of per-game hours
    pub total_playtime: u64,

    /// Games with nonzero playtime
    pub game_count_nonzero: u32,

    /// Mean hours per played game, one decimal
    pub average_playtime: f64,

    /// Median hours per played game
    pub median_playtime: f64,

    /// Names of the five most played games
    pub top_5_games: Vec<String>,

    /// Hours of the five most played games, parallel to `top_5_games`
    pub top_5_playtimes: Vec<u64>,

    /// Tier with the most playtime
    pub favorite_scale: ScaleTier,

    pub scale_distribution: ScaleDistribution,

    /// Genre with the most playtime ("Unknown" if none)
    pub favorite_genre_by_time: String,

    /// Genre on the most games ("Unknown" if none)
    pub favorite_genre_by_count: String,

    /// Shannon entropy of playtime across genres, two decimals
    pub genre_shannon_index: f64,

    /// Number of games per genre
    pub genre_distribution: Tally<String, u32>,

    /// Up to ten tags, heaviest first
    pub favorite_tags: Vec<String>,

    /// Share of playtime per tag, two decimals, zero weights dropped
    pub tag_weights: Tally<String, f64>,
}
