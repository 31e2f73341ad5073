//! Production-scale classification.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{OwnedGame, ScaleTier};

/// Genre that forces the Indie tier regardless of ownership.
pub const INDIE_GENRE: &str = "Indie";

/// Owners below this are Indie.
pub const INDIE_MAX_OWNERS: u64 = 100_000;

/// Owners below this (and at least [`INDIE_MAX_OWNERS`]) are AA.
pub const AA_MAX_OWNERS: u64 = 1_000_000;

fn range_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d[\d,]*\s*\.\.\s*(\d[\d,]*)").expect("valid owners range regex"))
}

fn number_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d[\d,]*").expect("valid owners number regex"))
}

fn parse_grouped(digits: &str) -> u64 {
    let cleaned: String = digits.chars().filter(|c| *c != ',').collect();
    // Only digits remain, so the sole failure is overflow.
    cleaned.parse().unwrap_or(u64::MAX)
}

/// Parse an ownership descriptor into an owner estimate.
///
/// `"5,000,000 .. 10,000,000"` gives the upper bound, a bare number gives
/// that number, anything else gives 0.
pub fn parse_owners(descriptor: &str) -> u64 {
    if let Some(caps) = range_pattern().captures(descriptor) {
        return parse_grouped(&caps[1]);
    }

    number_pattern()
        .find(descriptor)
        .map(|m| parse_grouped(m.as_str()))
        .unwrap_or(0)
}

/// Classify a game into a production-scale tier.
///
/// An "Indie" genre wins over the owner estimate.
pub fn classify(game: &OwnedGame) -> ScaleTier {
    if game.has_genre(INDIE_GENRE) {
        return ScaleTier::Indie;
    }

    let owners = game.owners.as_deref().map(parse_owners).unwrap_or(0);

    if owners < INDIE_MAX_OWNERS {
        ScaleTier::Indie
    } else if owners < AA_MAX_OWNERS {
        ScaleTier::DoubleA
    } else {
        ScaleTier::TripleA
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_owners_range_takes_upper_bound() {
        assert_eq!(parse_owners("5,000,000 .. 10,000,000"), 10_000_000);
        assert_eq!(parse_owners("0 .. 20,000"), 20_000);
        assert_eq!(parse_owners("20,000..50,000"), 50_000);
    }

    #[test]
    fn test_parse_owners_bare_number() {
        assert_eq!(parse_owners("50,000"), 50_000);
        assert_eq!(parse_owners("about 1,500 owners"), 1_500);
    }

    #[test]
    fn test_parse_owners_garbage_is_zero() {
        assert_eq!(parse_owners(""), 0);
        assert_eq!(parse_owners("unknown"), 0);
        assert_eq!(parse_owners(", .."), 0);
    }

    #[test]
    fn test_parse_owners_overflow_saturates() {
        assert_eq!(parse_owners("99999999999999999999999"), u64::MAX);
    }

    #[test]
    fn test_classify_thresholds() {
        let game = |owners: &str| OwnedGame::new(1).with_owners(owners);

        assert_eq!(classify(&game("5,000,000 .. 10,000,000")), ScaleTier::TripleA);
        assert_eq!(classify(&game("50,000")), ScaleTier::Indie);
        assert_eq!(classify(&game("99,999")), ScaleTier::Indie);
        assert_eq!(classify(&game("100,000")), ScaleTier::DoubleA);
        assert_eq!(classify(&game("200,000 .. 500,000")), ScaleTier::DoubleA);
        assert_eq!(classify(&game("1,000,000")), ScaleTier::TripleA);
    }

    #[test]
    fn test_classify_missing_owners_is_indie() {
        assert_eq!(classify(&OwnedGame::new(1)), ScaleTier::Indie);
        assert_eq!(
            classify(&OwnedGame::new(1).with_owners("n/a")),
            ScaleTier::Indie
        );
    }

    #[test]
    fn test_classify_indie_genre_overrides_owners() {
        let game = OwnedGame::new(1)
            .with_owners("500,000")
            .with_genres(&["Indie", "Action"]);
        assert_eq!(classify(&game), ScaleTier::Indie);

        let game = OwnedGame::new(1)
            .with_owners("10,000,000 .. 20,000,000")
            .with_genres(&["Action", " Indie "]);
        assert_eq!(classify(&game), ScaleTier::Indie);
    }

    #[test]
    fn test_classify_indie_match_is_case_sensitive() {
        let game = OwnedGame::new(1)
            .with_owners("5,000,000")
            .with_genres(&["indie"]);
        assert_eq!(classify(&game), ScaleTier::TripleA);
    }
}
