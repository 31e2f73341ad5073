//! Response envelopes of the Steam Web API.

use serde::{Deserialize, Serialize};

use super::{null_as_default, OwnedGame, SteamUser};

/// `ISteamUser/GetPlayerSummaries` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerSummariesResponse {
    pub response: PlayerSummaries,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerSummaries {
    #[serde(default, deserialize_with = "null_as_default")]
    pub players: Vec<SteamUser>,
}

/// `IPlayerService/GetOwnedGames` response.
///
/// Private libraries come back as `{"response": {}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnedGamesResponse {
    #[serde(default)]
    pub response: OwnedGames,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnedGames {
    #[serde(default)]
    pub game_count: Option<u32>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub games: Vec<OwnedGame>,
}

impl OwnedGamesResponse {
    /// Games, or `None` when the library is hidden or empty.
    pub fn into_games(self) -> Option<Vec<OwnedGame>> {
        let count = self.response.game_count.unwrap_or(0);
        if count == 0 || self.response.games.is_empty() {
            None
        } else {
            Some(self.response.games)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_summaries_parse() {
        let json = r#"{"response":{"players":[{"steamid":"1","personaname":"a"},{"steamid":"2"}]}}"#;
        let parsed: PlayerSummariesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.response.players.len(), 2);
        assert_eq!(parsed.response.players[1].nickname(), "Unknown");
    }

    #[test]
    fn test_owned_games_private_library() {
        let parsed: OwnedGamesResponse = serde_json::from_str(r#"{"response":{}}"#).unwrap();
        assert!(parsed.into_games().is_none());
    }

    #[test]
    fn test_owned_games_parse() {
        let json = r#"{"response":{"game_count":2,"games":[
            {"appid":10,"name":"Counter-Strike","playtime_forever":32},
            {"appid":20,"playtime_forever":0}
        ]}}"#;
        let parsed: OwnedGamesResponse = serde_json::from_str(json).unwrap();
        let games = parsed.into_games().unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].playtime_minutes(), 32);
    }
}
