use crate::models::{BettingOdds, Game, MoneylineOdds, Sport, SpreadOdds, TotalOdds};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

const ODDS_API_BASE_URL: &str = "https://api.the-odds-api.com/v4";
/// Only games tipping off within this window are returned
const LOOKAHEAD_HOURS: i64 = 48;

/// Response from The Odds API for a single game
#[derive(Debug, Deserialize)]
struct OddsApiGame {
    id: String,
    commence_time: DateTime<Utc>,
    home_team: String,
    away_team: String,
    bookmakers: Vec<OddsApiBookmaker>,
}

/// Bookmaker data from The Odds API
#[derive(Debug, Deserialize)]
struct OddsApiBookmaker {
    title: String,
    last_update: DateTime<Utc>,
    markets: Vec<OddsApiMarket>,
}

/// Market data (h2h, spreads, totals) from The Odds API
#[derive(Debug, Deserialize)]
struct OddsApiMarket {
    key: String,
    outcomes: Vec<OddsApiOutcome>,
}

/// Outcome data for a team or an Over/Under side
#[derive(Debug, Deserialize)]
struct OddsApiOutcome {
    name: String,
    price: f64,
    #[serde(default)]
    point: Option<f64>,
}

pub struct OddsApiClient {
    api_key: String,
    client: reqwest::Client,
}

impl OddsApiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Fetch upcoming games with moneyline, spread and total odds
    /// Only returns games that are in the future and within the lookahead window
    pub async fn fetch_games(&self, sport: Sport) -> Result<Vec<(Game, Vec<BettingOdds>)>> {
        let url = format!("{}/sports/{}/odds", ODDS_API_BASE_URL, sport.odds_api_key());

        let response = self
            .client
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("regions", "us"),
                ("markets", "h2h,spreads,totals"),
                ("oddsFormat", "american"),
            ])
            .send()
            .await
            .context("Failed to fetch odds from The Odds API")?;

        if !response.status().is_success() {
            anyhow::bail!("Odds API returned error: {}", response.status());
        }

        let api_games: Vec<OddsApiGame> = response
            .json()
            .await
            .context("Failed to parse Odds API response")?;

        let games = convert_games(sport, api_games, Utc::now());
        tracing::info!("Fetched {} upcoming {} games with odds", games.len(), sport);
        Ok(games)
    }

    /// Check how many API requests you have remaining
    pub async fn check_usage(&self) -> Result<()> {
        let url = format!("{}/sports", ODDS_API_BASE_URL);

        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        if let Some(remaining) = response.headers().get("x-requests-remaining") {
            println!("API requests remaining: {:?}", remaining);
        }

        if let Some(used) = response.headers().get("x-requests-used") {
            println!("API requests used: {:?}", used);
        }

        Ok(())
    }
}

fn convert_games(
    sport: Sport,
    api_games: Vec<OddsApiGame>,
    now: DateTime<Utc>,
) -> Vec<(Game, Vec<BettingOdds>)> {
    let horizon = now + Duration::hours(LOOKAHEAD_HOURS);

    api_games
        .into_iter()
        .filter(|api_game| api_game.commence_time > now && api_game.commence_time <= horizon)
        .map(|api_game| {
            let game = Game {
                id: api_game.id.clone(),
                sport,
                home_team: api_game.home_team.clone(),
                away_team: api_game.away_team.clone(),
                commence_time: api_game.commence_time,
            };

            let odds = api_game
                .bookmakers
                .into_iter()
                .map(|bookmaker| convert_bookmaker(&api_game.id, &api_game.home_team, bookmaker))
                .filter(|odds| {
                    !odds.moneyline.is_empty() || odds.spread.is_some() || odds.total.is_some()
                })
                .collect();

            (game, odds)
        })
        .collect()
}

fn convert_bookmaker(game_id: &str, home_team: &str, bookmaker: OddsApiBookmaker) -> BettingOdds {
    let market = |key: &str| bookmaker.markets.iter().find(|m| m.key == key);

    let moneyline: Vec<MoneylineOdds> = market("h2h")
        .map(|m| {
            m.outcomes
                .iter()
                .map(|outcome| MoneylineOdds {
                    team: outcome.name.clone(),
                    price: outcome.price as i32,
                })
                .collect()
        })
        .unwrap_or_default();

    let spread = market("spreads").and_then(|m| {
        let home = m.outcomes.iter().find(|o| o.name == home_team)?;
        let away = m.outcomes.iter().find(|o| o.name != home_team)?;
        Some(SpreadOdds {
            home_point: home.point?,
            home_price: home.price as i32,
            away_price: away.price as i32,
        })
    });

    let total = market("totals").and_then(|m| {
        let over = m.outcomes.iter().find(|o| o.name == "Over")?;
        let under = m.outcomes.iter().find(|o| o.name == "Under")?;
        Some(TotalOdds {
            point: over.point?,
            over_price: over.price as i32,
            under_price: under.price as i32,
        })
    });

    BettingOdds {
        game_id: game_id.to_string(),
        bookmaker: bookmaker.title.clone(),
        last_update: bookmaker.last_update,
        moneyline,
        spread,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"[
      {
        "id": "abc123",
        "sport_key": "basketball_nba",
        "sport_title": "NBA",
        "commence_time": "2026-01-10T00:30:00Z",
        "home_team": "Boston Celtics",
        "away_team": "New York Knicks",
        "bookmakers": [
          {
            "key": "draftkings",
            "title": "DraftKings",
            "last_update": "2026-01-09T18:00:00Z",
            "markets": [
              {"key": "h2h", "outcomes": [
                {"name": "Boston Celtics", "price": -245},
                {"name": "New York Knicks", "price": 200}
              ]},
              {"key": "spreads", "outcomes": [
                {"name": "Boston Celtics", "price": -110, "point": -6.5},
                {"name": "New York Knicks", "price": -110, "point": 6.5}
              ]},
              {"key": "totals", "outcomes": [
                {"name": "Over", "price": -112, "point": 224.5},
                {"name": "Under", "price": -108, "point": 224.5}
              ]}
            ]
          },
          {
            "key": "empty",
            "title": "Empty Book",
            "last_update": "2026-01-09T18:00:00Z",
            "markets": []
          }
        ]
      },
      {
        "id": "later",
        "commence_time": "2026-01-20T00:30:00Z",
        "home_team": "Miami Heat",
        "away_team": "Orlando Magic",
        "bookmakers": []
      }
    ]"#;

    #[test]
    fn test_convert_games() {
        let api_games: Vec<OddsApiGame> = serde_json::from_str(SAMPLE).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 9, 12, 0, 0).unwrap();
        let games = convert_games(Sport::Nba, api_games, now);

        assert_eq!(games.len(), 1);
        let (game, odds) = &games[0];
        assert_eq!(game.id, "abc123");
        assert_eq!(odds.len(), 1);

        let book = &odds[0];
        assert_eq!(book.bookmaker, "DraftKings");
        assert_eq!(book.moneyline.len(), 2);
        assert_eq!(
            book.spread,
            Some(SpreadOdds {
                home_point: -6.5,
                home_price: -110,
                away_price: -110
            })
        );
        assert_eq!(
            book.total,
            Some(TotalOdds {
                point: 224.5,
                over_price: -112,
                under_price: -108
            })
        );
    }

    #[tokio::test]
    #[ignore]
    async fn test_fetch_games() {
        dotenv::dotenv().ok();
        let api_key = std::env::var("ODDS_API_KEY").expect("ODDS_API_KEY not set");
        let client = OddsApiClient::new(api_key);

        let games = client.fetch_games(Sport::Nba).await.unwrap();
        println!("Fetched {} games", games.len());
    }
}
