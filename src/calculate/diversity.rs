//! Genre diversity (Shannon entropy of playtime).

use crate::models::Tally;

use super::round_to;

/// Shannon index `-Σ p ln p` with `p = genre minutes / total minutes`,
/// rounded to two decimals. Zero when there is no playtime.
///
/// A game counts toward every one of its genres, so the `p` values need
/// not sum to one.
pub fn shannon_index(genre_playtime: &Tally<String, u64>, total_minutes: u64) -> f64 {
    if total_minutes == 0 {
        return 0.0;
    }

    let total = total_minutes as f64;
    let entropy: f64 = genre_playtime
        .values()
        .map(|&minutes| minutes as f64 / total)
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.ln())
        .sum();

    if entropy <= 0.0 {
        0.0
    } else {
        round_to(entropy, 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(entries: &[(&str, u64)]) -> Tally<String, u64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_zero_total_is_zero() {
        assert_eq!(shannon_index(&tally(&[("RPG", 0)]), 0), 0.0);
        assert_eq!(shannon_index(&Tally::new(), 0), 0.0);
    }

    #[test]
    fn test_single_genre_with_all_playtime_is_zero() {
        assert_eq!(shannon_index(&tally(&[("RPG", 300)]), 300), 0.0);
    }

    #[test]
    fn test_even_split_is_ln_n() {
        let index = shannon_index(&tally(&[("RPG", 50), ("Action", 50)]), 100);
        assert_eq!(index, 0.69);

        let index = shannon_index(&tally(&[("A", 25), ("B", 25), ("C", 25), ("D", 25)]), 100);
        assert_eq!(index, 1.39);
    }

    #[test]
    fn test_overlapping_genres() {
        // 120 min RPG only, 60 min RPG + Indie: p(RPG) = 1, p(Indie) = 1/3
        let index = shannon_index(&tally(&[("RPG", 180), ("Indie", 60)]), 180);
        assert_eq!(index, 0.37);
    }

    #[test]
    fn test_no_genres_is_zero() {
        assert_eq!(shannon_index(&Tally::new(), 500), 0.0);
    }
}
