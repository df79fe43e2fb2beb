use crate::utils::grading::FinalScore;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const BASE_URL: &str = "https://api.balldontlie.io/v1";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NbaGameResult {
    pub id: u64,
    pub date: String,
    pub status: String,
    pub home_team: NbaTeam,
    pub visitor_team: NbaTeam,
    #[serde(default)]
    pub home_team_score: u32,
    #[serde(default)]
    pub visitor_team_score: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NbaTeam {
    pub id: u64,
    pub abbreviation: String,
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
struct GamesResponse {
    data: Vec<NbaGameResult>,
}

impl NbaGameResult {
    pub fn is_final(&self) -> bool {
        self.status.eq_ignore_ascii_case("final")
    }

    /// Final score, `None` until the game is over
    pub fn final_score(&self) -> Option<FinalScore> {
        if !self.is_final() {
            return None;
        }
        // "2026-01-09" or "2026-01-09T00:00:00.000Z"
        let date = NaiveDate::parse_from_str(self.date.get(..10)?, "%Y-%m-%d").ok()?;
        Some(FinalScore {
            date,
            home_team: self.home_team.full_name.clone(),
            away_team: self.visitor_team.full_name.clone(),
            home_score: self.home_team_score,
            away_score: self.visitor_team_score,
        })
    }
}

pub struct GameResultsApiClient {
    client: Client,
    api_key: String,
}

impl GameResultsApiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    pub async fn fetch_nba_game_results(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<NbaGameResult>, reqwest::Error> {
        let url = format!("{}/games", BASE_URL);

        let response = self
            .client
            .get(&url)
            .header("Authorization", &self.api_key)
            .query(&[("dates[]", date.format("%Y-%m-%d").to_string())])
            .send()
            .await?
            .error_for_status()?;

        let results: GamesResponse = response.json().await?;
        Ok(results.data)
    }

    /// Final scores for a date
    pub async fn fetch_final_scores(&self, date: NaiveDate) -> Result<Vec<FinalScore>, reqwest::Error> {
        let results = self.fetch_nba_game_results(date).await?;
        Ok(results.iter().filter_map(NbaGameResult::final_score).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
      "data": [
        {
          "id": 1, "date": "2026-01-09", "season": 2025, "status": "Final",
          "period": 4, "time": "Final", "postseason": false,
          "home_team_score": 118, "visitor_team_score": 109,
          "home_team": {"id": 2, "abbreviation": "BOS", "city": "Boston", "full_name": "Boston Celtics", "name": "Celtics"},
          "visitor_team": {"id": 20, "abbreviation": "NYK", "city": "New York", "full_name": "New York Knicks", "name": "Knicks"}
        },
        {
          "id": 2, "date": "2026-01-09T00:00:00.000Z", "status": "7:30 pm ET",
          "home_team": {"id": 14, "abbreviation": "LAL", "full_name": "Los Angeles Lakers"},
          "visitor_team": {"id": 10, "abbreviation": "GSW", "full_name": "Golden State Warriors"}
        }
      ],
      "meta": {"per_page": 25}
    }"#;

    #[test]
    fn test_final_scores() {
        let response: GamesResponse = serde_json::from_str(SAMPLE).unwrap();
        let scores: Vec<FinalScore> = response
            .data
            .iter()
            .filter_map(NbaGameResult::final_score)
            .collect();

        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].home_team, "Boston Celtics");
        assert_eq!(scores[0].away_score, 109);
        assert_eq!(scores[0].date, NaiveDate::from_ymd_opt(2026, 1, 9).unwrap());
        assert!(!response.data[1].is_final());
    }

    #[tokio::test]
    #[ignore]
    async fn test_fetch_games() {
        dotenv::dotenv().ok();
        let api_key = std::env::var("BALLDONTLIE_API_KEY").expect("BALLDONTLIE_API_KEY not set");
        let client = GameResultsApiClient::new(api_key);
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let games = client.fetch_final_scores(date).await.unwrap();
        assert!(!games.is_empty());
    }
}
