use crate::error::ShivaError;
use crate::models::teams::team_abbreviation;
use crate::models::{GameLine, TeamStats};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

const MSF_BASE_URL: &str = "https://api.mysportsfeeds.com/v2.1/pull/nba";
/// MySportsFeeds takes the API key as the basic-auth user with this password
const MSF_PASSWORD: &str = "MYSPORTSFEEDS";

/// Source of team statistics for the pipeline
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Stats for a team (full name or abbreviation) over its last `last_n` games
    async fn team_stats(&self, team: &str, last_n: usize) -> Result<TeamStats>;
}

#[derive(Debug, Deserialize)]
struct GamelogsResponse {
    #[serde(default)]
    gamelogs: Vec<MsfGamelog>,
}

#[derive(Debug, Deserialize)]
struct MsfGamelog {
    game: MsfGame,
    stats: MsfStats,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MsfGame {
    id: u64,
    start_time: DateTime<Utc>,
    home_team_abbreviation: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MsfStats {
    field_goals: MsfFieldGoals,
    free_throws: MsfFreeThrows,
    rebounds: MsfRebounds,
    offense: MsfOffense,
    defense: MsfDefense,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MsfFieldGoals {
    #[serde(rename = "fgMade")]
    fg_made: u32,
    #[serde(rename = "fgAtt")]
    fg_att: u32,
    #[serde(rename = "fg3PtMade")]
    fg3_made: u32,
    #[serde(rename = "fg3PtAtt")]
    fg3_att: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MsfFreeThrows {
    ft_made: u32,
    ft_att: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MsfRebounds {
    off_reb: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MsfOffense {
    pts: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MsfDefense {
    tov: u32,
    pts_against: u32,
}

/// MySportsFeeds uses a few non-standard abbreviations
fn msf_abbreviation(abbr: &str) -> &str {
    match abbr {
        "BKN" => "BRO",
        "OKC" => "OKL",
        other => other,
    }
}

pub struct MySportsFeedsClient {
    api_key: String,
    season: String,
    client: reqwest::Client,
}

impl MySportsFeedsClient {
    /// `season` is an MSF season slug such as "current" or "2025-2026-regular"
    pub fn new(api_key: String, season: String) -> Self {
        Self {
            api_key,
            season,
            client: reqwest::Client::new(),
        }
    }

    /// Most recent game logs for a team, newest first
    pub async fn fetch_game_lines(&self, abbr: &str, last_n: usize) -> Result<Vec<GameLine>> {
        let url = format!("{}/{}/team_gamelogs.json", MSF_BASE_URL, self.season);
        let msf_team = msf_abbreviation(abbr);
        let limit = last_n.to_string();

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.api_key, Some(MSF_PASSWORD))
            .query(&[
                ("team", msf_team),
                ("sort", "game.starttime.D"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .context("Failed to fetch team game logs from MySportsFeeds")?;

        if !response.status().is_success() {
            anyhow::bail!("MySportsFeeds returned error: {}", response.status());
        }

        let body: GamelogsResponse = response
            .json()
            .await
            .context("Failed to parse MySportsFeeds game logs")?;

        Ok(convert_gamelogs(msf_team, body, last_n))
    }
}

#[async_trait]
impl StatsProvider for MySportsFeedsClient {
    async fn team_stats(&self, team: &str, last_n: usize) -> Result<TeamStats> {
        let abbr = team_abbreviation(team).ok_or_else(|| ShivaError::UnknownTeam(team.to_string()))?;
        let lines = self.fetch_game_lines(abbr, last_n).await?;
        tracing::debug!("{}: {} game logs", abbr, lines.len());
        Ok(TeamStats::from_game_lines(abbr, &lines)?)
    }
}

fn convert_gamelogs(msf_team: &str, body: GamelogsResponse, last_n: usize) -> Vec<GameLine> {
    let mut lines: Vec<GameLine> = body
        .gamelogs
        .into_iter()
        .map(|log| GameLine {
            game_id: log.game.id.to_string(),
            start_time: log.game.start_time,
            is_home: log.game.home_team_abbreviation == msf_team,
            points: log.stats.offense.pts,
            opp_points: log.stats.defense.pts_against,
            fgm: log.stats.field_goals.fg_made,
            fga: log.stats.field_goals.fg_att,
            fg3m: log.stats.field_goals.fg3_made,
            fg3a: log.stats.field_goals.fg3_att,
            ftm: log.stats.free_throws.ft_made,
            fta: log.stats.free_throws.ft_att,
            oreb: log.stats.rebounds.off_reb,
            tov: log.stats.defense.tov,
        })
        .collect();

    lines.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    lines.truncate(last_n);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
      "lastUpdatedOn": "2026-01-09T12:00:00.000Z",
      "gamelogs": [
        {
          "game": {"id": 101, "startTime": "2026-01-05T00:30:00.000Z",
                   "awayTeamAbbreviation": "BRO", "homeTeamAbbreviation": "BOS"},
          "team": {"id": 82, "abbreviation": "BRO"},
          "stats": {
            "fieldGoals": {"fgMade": 40, "fgAtt": 88, "fg3PtMade": 12, "fg3PtAtt": 35, "fgPct": 45.5},
            "freeThrows": {"ftMade": 17, "ftAtt": 21},
            "rebounds": {"offReb": 9, "defReb": 33},
            "offense": {"pts": 109, "ast": 24},
            "defense": {"tov": 14, "stl": 7, "ptsAgainst": 118}
          }
        },
        {
          "game": {"id": 102, "startTime": "2026-01-07T00:30:00.000Z",
                   "awayTeamAbbreviation": "MIA", "homeTeamAbbreviation": "BRO"},
          "team": {"id": 82, "abbreviation": "BRO"},
          "stats": {
            "fieldGoals": {"fgMade": 43, "fgAtt": 86, "fg3PtMade": 15, "fg3PtAtt": 38},
            "freeThrows": {"ftMade": 14, "ftAtt": 18},
            "rebounds": {"offReb": 11},
            "offense": {"pts": 115},
            "defense": {"tov": 12, "ptsAgainst": 104}
          }
        }
      ]
    }"#;

    #[test]
    fn test_convert_gamelogs() {
        let body: GamelogsResponse = serde_json::from_str(SAMPLE).unwrap();
        let lines = convert_gamelogs("BRO", body, 10);
        assert_eq!(lines.len(), 2);

        // Newest first
        assert_eq!(lines[0].game_id, "102");
        assert!(lines[0].is_home);
        assert!(!lines[1].is_home);
        assert_eq!(lines[1].points, 109);
        assert_eq!(lines[1].opp_points, 118);
        assert_eq!(lines[1].fg3a, 35);
        assert_eq!(lines[1].tov, 14);

        let stats = TeamStats::from_game_lines("BKN", &lines).unwrap();
        assert_eq!(stats.games, 2);
        assert!((stats.points - 112.0).abs() < 1e-9);
    }

    #[test]
    fn test_convert_gamelogs_truncates() {
        let body: GamelogsResponse = serde_json::from_str(SAMPLE).unwrap();
        let lines = convert_gamelogs("BRO", body, 1);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].game_id, "102");
    }

    #[test]
    fn test_msf_abbreviation() {
        assert_eq!(msf_abbreviation("BKN"), "BRO");
        assert_eq!(msf_abbreviation("OKC"), "OKL");
        assert_eq!(msf_abbreviation("BOS"), "BOS");
    }

    #[tokio::test]
    #[ignore]
    async fn test_fetch_team_stats() {
        dotenv::dotenv().ok();
        let api_key = std::env::var("MYSPORTSFEEDS_API_KEY").expect("MYSPORTSFEEDS_API_KEY not set");
        let client = MySportsFeedsClient::new(api_key, "current".to_string());
        let stats = client.team_stats("Boston Celtics", 10).await.unwrap();
        println!("{:?}", stats);
    }
}
