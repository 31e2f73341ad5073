//! Assembly of the per-user analytics record.

use crate::models::{OwnedGame, SteamUser, UserDatasetRecord};

use super::{
    average, favorite_or_unknown, favorite_scale, favorite_tags, genre_counts, genre_playtime,
    median, minutes_to_hours, scale_distribution, shannon_index, tag_weights, top_n,
    FAVORITE_TAG_LIMIT,
};

/// Number of games in the top-played lists.
pub const TOP_GAMES: usize = 5;

/// Build the analytics record for one user.
///
/// Only games with positive playtime are considered. Returns `None` when
/// there are none; callers treat that as "skip this user", not a failure.
pub fn build_record(user: &SteamUser) -> Option<UserDatasetRecord> {
    let played: Vec<&OwnedGame> = user
        .owned_games
        .iter()
        .filter(|g| g.playtime_minutes() > 0)
        .collect();

    if played.is_empty() {
        return None;
    }

    let hours: Vec<u64> = played
        .iter()
        .map(|g| minutes_to_hours(g.playtime_minutes()))
        .collect();
    let total_minutes: u64 = played.iter().map(|g| g.playtime_minutes()).sum();

    let top = top_n(&played, TOP_GAMES);
    let genre_time = genre_playtime(&played);
    let genre_distribution = genre_counts(&played);
    let weights = tag_weights(&played);

    Some(UserDatasetRecord {
        user_id: user.steamid.clone(),
        nickname: user.nickname().to_string(),
        loccountrycode: user.country_code().to_string(),
        total_playtime: hours.iter().sum(),
        game_count_nonzero: played.len() as u32,
        average_playtime: average(&hours),
        median_playtime: median(&hours),
        top_5_games: top.iter().map(|g| g.display_name()).collect(),
        top_5_playtimes: top
            .iter()
            .map(|g| minutes_to_hours(g.playtime_minutes()))
            .collect(),
        favorite_scale: favorite_scale(&played),
        scale_distribution: scale_distribution(&played),
        favorite_genre_by_time: favorite_or_unknown(&genre_time),
        favorite_genre_by_count: favorite_or_unknown(&genre_distribution),
        genre_shannon_index: shannon_index(&genre_time, total_minutes),
        genre_distribution,
        favorite_tags: favorite_tags(&weights, FAVORITE_TAG_LIMIT),
        tag_weights: weights,
    })
}
