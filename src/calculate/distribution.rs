//! Weighted and unweighted tallies over a set of games.
//!
//! Every distribution is a fold of `(key, weight)` pairs into a
//! [`Tally`], so ranking ties always resolve to the key seen first.

use std::ops::AddAssign;

use crate::models::{OwnedGame, ScaleDistribution, ScaleTier, Tally, UNKNOWN};

use super::{classify, round_to};

/// Number of tags kept in `favorite_tags`.
pub const FAVORITE_TAG_LIMIT: usize = 10;

/// Decimal places of tag weights.
const TAG_WEIGHT_DECIMALS: i32 = 2;

/// Fold games into `init`: each game adds `weight(game)` to every key
/// produced by `keys(game)`.
pub fn tally_into<K, V, I>(
    init: Tally<K, V>,
    games: &[&OwnedGame],
    keys: impl Fn(&OwnedGame) -> I,
    weight: impl Fn(&OwnedGame) -> V,
) -> Tally<K, V>
where
    K: PartialEq,
    V: AddAssign + Copy,
    I: IntoIterator<Item = K>,
{
    games.iter().fold(init, |tally, &game| {
        let w = weight(game);
        keys(game)
            .into_iter()
            .fold(tally, |tally, key| tally.with(key, w))
    })
}

/// [`tally_into`] starting from an empty tally.
pub fn tally_by<K, V, I>(
    games: &[&OwnedGame],
    keys: impl Fn(&OwnedGame) -> I,
    weight: impl Fn(&OwnedGame) -> V,
) -> Tally<K, V>
where
    K: PartialEq,
    V: AddAssign + Copy,
    I: IntoIterator<Item = K>,
{
    tally_into(Tally::new(), games, keys, weight)
}

/// Distinct values in first-seen order.
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values.fold(Vec::new(), |mut seen: Vec<String>, value| {
        if !seen.iter().any(|s| s == value) {
            seen.push(value.to_string());
        }
        seen
    })
}

/// Trimmed, non-blank genres of a game, each once.
pub fn genre_keys(game: &OwnedGame) -> Vec<String> {
    distinct(game.trimmed_genres())
}

/// Top tags of a game as given, each once.
pub fn tag_keys(game: &OwnedGame) -> Vec<String> {
    distinct(game.top_tags.iter().map(String::as_str))
}

/// Number of games per genre.
pub fn genre_counts(games: &[&OwnedGame]) -> Tally<String, u32> {
    tally_by(games, genre_keys, |_| 1)
}

/// Playtime minutes per genre. A game adds its full playtime to each of
/// its genres.
pub fn genre_playtime(games: &[&OwnedGame]) -> Tally<String, u64> {
    tally_by(games, genre_keys, OwnedGame::playtime_minutes)
}

/// Number of games per scale tier, all tiers present.
pub fn scale_counts(games: &[&OwnedGame]) -> Tally<ScaleTier, u32> {
    tally_into(Tally::seeded(ScaleTier::ALL), games, |g| [classify(g)], |_| 1)
}

/// Playtime minutes per scale tier, all tiers present.
pub fn scale_playtime(games: &[&OwnedGame]) -> Tally<ScaleTier, u64> {
    tally_into(
        Tally::seeded(ScaleTier::ALL),
        games,
        |g| [classify(g)],
        OwnedGame::playtime_minutes,
    )
}

/// Scale counts in record form.
pub fn scale_distribution(games: &[&OwnedGame]) -> ScaleDistribution {
    ScaleDistribution::from(&scale_counts(games))
}

/// Tier with the most playtime; Indie, then AA, then AAA on ties.
pub fn favorite_scale(games: &[&OwnedGame]) -> ScaleTier {
    scale_playtime(games)
        .top()
        .copied()
        .unwrap_or(ScaleTier::Indie)
}

/// Highest-weighted key of a string tally, or "Unknown" when empty.
pub fn favorite_or_unknown<V: PartialOrd>(tally: &Tally<String, V>) -> String {
    tally
        .top()
        .cloned()
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Share of total playtime spent in games carrying each tag.
///
/// Weights are rounded to two decimals and tags that round to zero are
/// dropped. Empty when the games have no playtime.
pub fn tag_weights(games: &[&OwnedGame]) -> Tally<String, f64> {
    let total: u64 = games.iter().map(|g| g.playtime_minutes()).sum();
    if total == 0 {
        return Tally::new();
    }

    tally_by(games, tag_keys, OwnedGame::playtime_minutes).filter_map_values(|minutes| {
        let weight = round_to(minutes as f64 / total as f64, TAG_WEIGHT_DECIMALS);
        (weight > 0.0).then_some(weight)
    })
}

/// Up to `limit` tags by descending weight.
pub fn favorite_tags(weights: &Tally<String, f64>, limit: usize) -> Vec<String> {
    weights
        .ranked()
        .into_iter()
        .take(limit)
        .map(|(tag, _)| tag.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(games: &[OwnedGame]) -> Vec<&OwnedGame> {
        games.iter().collect()
    }

    #[test]
    fn test_genre_counts_trim_and_skip_blank() {
        let games = vec![
            OwnedGame::new(1).with_playtime(10).with_genres(&["RPG", " Action"]),
            OwnedGame::new(2).with_playtime(10).with_genres(&["Action ", "", "  "]),
        ];
        let counts = genre_counts(&refs(&games));

        assert_eq!(counts.len(), 2);
        assert_eq!(counts.get("RPG"), Some(&1));
        assert_eq!(counts.get("Action"), Some(&2));
        assert_eq!(counts.get(""), None);
    }

    #[test]
    fn test_blank_genres_left_out_of_playtime_and_diversity() {
        let games = vec![
            OwnedGame::new(1).with_playtime(60).with_genres(&["RPG", "   "]),
            OwnedGame::new(2).with_playtime(60).with_genres(&["\t", ""]),
        ];
        let playtime = genre_playtime(&refs(&games));

        assert_eq!(playtime.len(), 1);
        assert_eq!(playtime.get("RPG"), Some(&60));
        assert_eq!(playtime.get(""), None);

        // RPG alone: -0.5 ln 0.5. A blank bucket would add the same again.
        assert_eq!(crate::calculate::shannon_index(&playtime, 120), 0.35);
    }

    #[test]
    fn test_genre_listed_twice_counts_once() {
        let games = vec![OwnedGame::new(1).with_playtime(30).with_genres(&["RPG", "RPG "])];
        assert_eq!(genre_counts(&refs(&games)).get("RPG"), Some(&1));
        assert_eq!(genre_playtime(&refs(&games)).get("RPG"), Some(&30));
    }

    #[test]
    fn test_genre_playtime_multi_valued() {
        let games = vec![
            OwnedGame::new(1).with_playtime(120).with_genres(&["RPG"]),
            OwnedGame::new(2).with_playtime(60).with_genres(&["RPG", "Indie"]),
        ];
        let playtime = genre_playtime(&refs(&games));

        assert_eq!(playtime.get("RPG"), Some(&180));
        assert_eq!(playtime.get("Indie"), Some(&60));
        assert_eq!(favorite_or_unknown(&playtime), "RPG");
    }

    #[test]
    fn test_favorite_tie_goes_to_first_seen() {
        let games = vec![
            OwnedGame::new(1).with_playtime(60).with_genres(&["Strategy"]),
            OwnedGame::new(2).with_playtime(60).with_genres(&["Racing"]),
        ];
        assert_eq!(favorite_or_unknown(&genre_playtime(&refs(&games))), "Strategy");
        assert_eq!(favorite_or_unknown(&genre_counts(&refs(&games))), "Strategy");
    }

    #[test]
    fn test_favorite_without_genres_is_unknown() {
        let games = vec![OwnedGame::new(1).with_playtime(60)];
        assert_eq!(favorite_or_unknown(&genre_counts(&refs(&games))), "Unknown");
    }

    #[test]
    fn test_scale_counts_zero_filled() {
        let games = vec![
            OwnedGame::new(1).with_playtime(10).with_owners("5,000,000 .. 10,000,000"),
            OwnedGame::new(2).with_playtime(10).with_owners("20,000,000 .. 50,000,000"),
        ];
        let dist = scale_distribution(&refs(&games));

        assert_eq!(dist.indie, 0);
        assert_eq!(dist.aa, 0);
        assert_eq!(dist.aaa, 2);
    }

    #[test]
    fn test_favorite_scale_by_playtime_not_count() {
        let games = vec![
            OwnedGame::new(1).with_playtime(10).with_owners("10,000"),
            OwnedGame::new(2).with_playtime(10).with_owners("20,000"),
            OwnedGame::new(3).with_playtime(500).with_owners("2,000,000 .. 5,000,000"),
        ];
        assert_eq!(favorite_scale(&refs(&games)), ScaleTier::TripleA);
        assert_eq!(scale_distribution(&refs(&games)).indie, 2);
    }

    #[test]
    fn test_favorite_scale_tie_prefers_smaller_tier() {
        let games = vec![
            OwnedGame::new(1).with_playtime(100).with_owners("5,000,000"),
            OwnedGame::new(2).with_playtime(100).with_owners("500,000"),
        ];
        assert_eq!(favorite_scale(&refs(&games)), ScaleTier::DoubleA);
    }

    #[test]
    fn test_tag_weights_share_of_playtime() {
        let games = vec![
            OwnedGame::new(1).with_playtime(300).with_top_tags(&["RPG", "Fantasy"]),
            OwnedGame::new(2).with_playtime(100).with_top_tags(&["RPG", "Puzzle"]),
        ];
        let weights = tag_weights(&refs(&games));

        assert_eq!(weights.get("RPG"), Some(&1.0));
        assert_eq!(weights.get("Fantasy"), Some(&0.75));
        assert_eq!(weights.get("Puzzle"), Some(&0.25));
        assert_eq!(
            favorite_tags(&weights, FAVORITE_TAG_LIMIT),
            vec!["RPG", "Fantasy", "Puzzle"]
        );
    }

    #[test]
    fn test_tag_weights_drop_rounded_zero() {
        let games = vec![
            OwnedGame::new(1).with_playtime(10_000).with_top_tags(&["Shooter"]),
            OwnedGame::new(2).with_playtime(1).with_top_tags(&["Cozy"]),
        ];
        let weights = tag_weights(&refs(&games));

        assert_eq!(weights.len(), 1);
        assert_eq!(weights.get("Cozy"), None);
        assert!(weights.values().all(|w| *w > 0.0 && *w <= 1.0));
    }

    #[test]
    fn test_tag_weights_no_playtime_is_empty() {
        let games = vec![OwnedGame::new(1).with_top_tags(&["RPG"])];
        assert!(tag_weights(&refs(&games)).is_empty());
    }

    #[test]
    fn test_favorite_tags_limit() {
        let tags: Vec<String> = (0..15).map(|i| format!("tag{}", i)).collect();
        let weights: Tally<String, f64> = tags.iter().map(|t| (t.clone(), 0.5)).collect();

        let favorites = favorite_tags(&weights, FAVORITE_TAG_LIMIT);
        assert_eq!(favorites.len(), 10);
        assert_eq!(favorites[0], "tag0");
        assert_eq!(favorites[9], "tag9");
    }
}
