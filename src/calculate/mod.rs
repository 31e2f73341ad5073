//! Analytics derivation engine.
//!
//! Pure, deterministic computations that turn one user's owned games into
//! a [`UserDatasetRecord`](crate::models::UserDatasetRecord):
//! - Production-scale classification of each game
//! - Count and playtime-weighted distributions
//! - Shannon diversity index over genres
//! - Record assembly
//!
//! Nothing here performs I/O or keeps state, so users can be processed in
//! any order or in parallel.

pub mod distribution;
pub mod diversity;
pub mod record;
pub mod scale;

pub use distribution::*;
pub use diversity::shannon_index;
pub use record::{build_record, TOP_GAMES};
pub use scale::{classify, parse_owners};

use crate::models::OwnedGame;

const MINUTES_PER_HOUR: f64 = 60.0;

/// Round to `decimals` places, halves away from zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Convert minutes to whole hours (90 minutes -> 2).
pub fn minutes_to_hours(minutes: u64) -> u64 {
    (minutes as f64 / MINUTES_PER_HOUR).round() as u64
}

/// Mean of hour values to one decimal; 0 for an empty slice.
pub fn average(hours: &[u64]) -> f64 {
    if hours.is_empty() {
        return 0.0;
    }
    let total: u64 = hours.iter().sum();
    round_to(total as f64 / hours.len() as f64, 1)
}

/// Median of hour values; 0 for an empty slice.
///
/// Odd lengths give the middle value as is, even lengths the mean of the
/// two middle values to one decimal.
pub fn median(hours: &[u64]) -> f64 {
    if hours.is_empty() {
        return 0.0;
    }

    let mut sorted = hours.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;

    if sorted.len() % 2 == 0 {
        round_to((sorted[mid - 1] + sorted[mid]) as f64 / 2.0, 1)
    } else {
        sorted[mid] as f64
    }
}

/// The `n` most played games, stable on equal playtime.
pub fn top_n<'a>(games: &[&'a OwnedGame], n: usize) -> Vec<&'a OwnedGame> {
    let mut ranked = games.to_vec();
    ranked.sort_by(|a, b| b.playtime_minutes().cmp(&a.playtime_minutes()));
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_to_hours_rounds_half_up() {
        assert_eq!(minutes_to_hours(0), 0);
        assert_eq!(minutes_to_hours(29), 0);
        assert_eq!(minutes_to_hours(30), 1);
        assert_eq!(minutes_to_hours(89), 1);
        assert_eq!(minutes_to_hours(90), 2);
        assert_eq!(minutes_to_hours(120), 2);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.25, 1), 1.3);
        assert_eq!(round_to(0.333, 2), 0.33);
        assert_eq!(round_to(0.005, 2), 0.01);
        assert_eq!(round_to(7.0, 1), 7.0);
    }

    #[test]
    fn test_average() {
        assert_eq!(average(&[]), 0.0);
        assert_eq!(average(&[2, 1]), 1.5);
        assert_eq!(average(&[1, 1, 2]), 1.3);
    }

    #[test]
    fn test_median_odd_is_middle_value() {
        assert_eq!(median(&[9, 1, 4]), 4.0);
        assert_eq!(median(&[7]), 7.0);
    }

    #[test]
    fn test_median_even_averages_middle_pair() {
        assert_eq!(median(&[2, 1]), 1.5);
        assert_eq!(median(&[1, 10, 3, 4]), 3.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_top_n_is_stable() {
        let a = OwnedGame::new(1).with_playtime(100);
        let b = OwnedGame::new(2).with_playtime(300);
        let c = OwnedGame::new(3).with_playtime(100);
        let d = OwnedGame::new(4).with_playtime(50);
        let games = vec![&a, &b, &c, &d];

        let top: Vec<u64> = top_n(&games, 3).iter().map(|g| g.appid).collect();
        assert_eq!(top, vec![2, 1, 3]);
        assert_eq!(top_n(&games, 10).len(), 4);
    }
}
