use crate::error::ShivaError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub mod teams;

/// Games needed before a recent-form net rating is reported
pub const RECENT_FORM_GAMES: usize = 5;
/// Games needed on one side of a home/road split
pub const MIN_SPLIT_GAMES: usize = 2;
/// Free throws that end a possession (NBA convention)
const FREE_THROW_POSSESSION_FACTOR: f64 = 0.44;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sport {
    Nba,
}

impl Sport {
    /// Sport key used by The Odds API
    pub fn odds_api_key(&self) -> &'static str {
        match self {
            Sport::Nba => "basketball_nba",
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sport::Nba => write!(f, "NBA"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BetType {
    Total,
    Spread,
}

impl BetType {
    pub const ALL: [BetType; 2] = [BetType::Total, BetType::Spread];
}

impl fmt::Display for BetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetType::Total => write!(f, "TOTAL"),
            BetType::Spread => write!(f, "SPREAD"),
        }
    }
}

/// The side of a bet. Positive signals point at `Over` / `Away`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Over,
    Under,
    Away,
    Home,
}

impl Side {
    /// Map a signed aggregate onto a side; zero has no side
    pub fn from_signal(bet_type: BetType, net: f64) -> Option<Side> {
        if !net.is_finite() || net == 0.0 {
            return None;
        }
        let positive = net > 0.0;
        Some(match (bet_type, positive) {
            (BetType::Total, true) => Side::Over,
            (BetType::Total, false) => Side::Under,
            (BetType::Spread, true) => Side::Away,
            (BetType::Spread, false) => Side::Home,
        })
    }

    pub fn bet_type(&self) -> BetType {
        match self {
            Side::Over | Side::Under => BetType::Total,
            Side::Away | Side::Home => BetType::Spread,
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Side::Over | Side::Away)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Side::Over => "OVER",
            Side::Under => "UNDER",
            Side::Away => "AWAY",
            Side::Home => "HOME",
        };
        write!(f, "{}", label)
    }
}

/// Represents an NBA game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Game {
    pub id: String,
    pub sport: Sport,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
}

/// Moneyline odds for a team
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoneylineOdds {
    pub team: String,
    pub price: i32, // American odds format (e.g., -110, +150)
}

/// Point spread quoted from the home team's perspective
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpreadOdds {
    pub home_point: f64,
    pub home_price: i32,
    pub away_price: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TotalOdds {
    pub point: f64,
    pub over_price: i32,
    pub under_price: i32,
}

/// Betting odds from a sportsbook
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BettingOdds {
    pub game_id: String,
    pub bookmaker: String,
    pub last_update: DateTime<Utc>,
    pub moneyline: Vec<MoneylineOdds>,
    pub spread: Option<SpreadOdds>,
    pub total: Option<TotalOdds>,
}

/// Consensus market across every bookmaker quoting a game
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarketLine {
    pub total: Option<f64>,
    pub over_price: Option<i32>,
    pub under_price: Option<i32>,
    pub spread_home: Option<f64>,
    pub home_spread_price: Option<i32>,
    pub away_spread_price: Option<i32>,
    pub home_moneyline: Option<i32>,
    pub away_moneyline: Option<i32>,
    pub bookmakers: usize,
}

impl MarketLine {
    /// Median of every market the bookmakers quote
    pub fn consensus(game: &Game, odds: &[BettingOdds]) -> Self {
        let totals: Vec<&TotalOdds> = odds.iter().filter_map(|o| o.total.as_ref()).collect();
        let spreads: Vec<&SpreadOdds> = odds.iter().filter_map(|o| o.spread.as_ref()).collect();
        let moneyline_for = |team: &str| -> Vec<i32> {
            odds.iter()
                .flat_map(|o| o.moneyline.iter())
                .filter(|m| m.team == team)
                .map(|m| m.price)
                .collect()
        };

        Self {
            total: median(totals.iter().map(|t| t.point).collect()),
            over_price: median_price(totals.iter().map(|t| t.over_price).collect()),
            under_price: median_price(totals.iter().map(|t| t.under_price).collect()),
            spread_home: median(spreads.iter().map(|s| s.home_point).collect()),
            home_spread_price: median_price(spreads.iter().map(|s| s.home_price).collect()),
            away_spread_price: median_price(spreads.iter().map(|s| s.away_price).collect()),
            home_moneyline: median_price(moneyline_for(&game.home_team)),
            away_moneyline: median_price(moneyline_for(&game.away_team)),
            bookmakers: odds.len(),
        }
    }

    /// The line a bet on `side` is graded against
    pub fn line_for(&self, side: Side) -> Option<f64> {
        match side {
            Side::Over | Side::Under => self.total,
            Side::Home => self.spread_home,
            Side::Away => self.spread_home.map(|s| -s),
        }
    }

    pub fn price_for(&self, side: Side) -> Option<i32> {
        match side {
            Side::Over => self.over_price,
            Side::Under => self.under_price,
            Side::Home => self.home_spread_price,
            Side::Away => self.away_spread_price,
        }
    }

    pub fn has_line(&self, bet_type: BetType) -> bool {
        match bet_type {
            BetType::Total => self.total.is_some(),
            BetType::Spread => self.spread_home.is_some(),
        }
    }
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    values.retain(|v| v.is_finite());
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// American prices are not averaged; the lower-middle quote is used
fn median_price(mut prices: Vec<i32>) -> Option<i32> {
    if prices.is_empty() {
        return None;
    }
    prices.sort_unstable();
    Some(prices[(prices.len() - 1) / 2])
}

/// One team's box score for one game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameLine {
    pub game_id: String,
    pub start_time: DateTime<Utc>,
    pub is_home: bool,
    pub points: u32,
    pub opp_points: u32,
    pub fgm: u32,
    pub fga: u32,
    pub fg3m: u32,
    pub fg3a: u32,
    pub ftm: u32,
    pub fta: u32,
    pub oreb: u32,
    pub tov: u32,
}

impl GameLine {
    pub fn possessions(&self) -> f64 {
        self.fga as f64 + FREE_THROW_POSSESSION_FACTOR * self.fta as f64 - self.oreb as f64
            + self.tov as f64
    }
}

/// Team averages over a window of games
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamStats {
    pub team: String,
    pub games: usize,
    pub pace: f64,
    pub off_rating: f64,
    pub def_rating: f64,
    pub efg_pct: f64,
    pub three_pct: f64,
    pub three_rate: f64,
    pub ft_rate: f64,
    pub turnovers: f64,
    pub off_rebounds: f64,
    pub points: f64,
    pub opp_points: f64,
    pub recent_net_rating: Option<f64>,
    pub home_net_rating: Option<f64>,
    pub road_net_rating: Option<f64>,
}

impl TeamStats {
    /// Aggregate box scores into per-game and per-100-possession numbers.
    /// Rates are computed from summed totals, not averaged per game.
    pub fn from_game_lines(team: &str, lines: &[GameLine]) -> Result<Self, ShivaError> {
        let mut lines = lines.to_vec();
        lines.sort_by_key(|l| l.start_time);

        let games = lines.len();
        let possessions: f64 = lines.iter().map(GameLine::possessions).sum();
        let fga: u32 = lines.iter().map(|l| l.fga).sum();
        if games == 0 || fga == 0 || possessions <= 0.0 {
            return Err(ShivaError::InsufficientStats(team.to_string()));
        }

        let sum = |f: fn(&GameLine) -> u32| lines.iter().map(f).sum::<u32>() as f64;
        let fga = fga as f64;
        let fg3a = sum(|l| l.fg3a);
        let points = sum(|l| l.points);
        let opp_points = sum(|l| l.opp_points);

        let recent_net_rating = if games >= RECENT_FORM_GAMES {
            net_rating_of(lines[games - RECENT_FORM_GAMES..].iter())
        } else {
            None
        };
        let split = |home: bool| {
            let side: Vec<&GameLine> = lines.iter().filter(|l| l.is_home == home).collect();
            if side.len() >= MIN_SPLIT_GAMES {
                net_rating_of(side.into_iter())
            } else {
                None
            }
        };

        Ok(Self {
            team: team.to_string(),
            games,
            pace: possessions / games as f64,
            off_rating: 100.0 * points / possessions,
            def_rating: 100.0 * opp_points / possessions,
            efg_pct: (sum(|l| l.fgm) + 0.5 * sum(|l| l.fg3m)) / fga,
            three_pct: if fg3a > 0.0 { sum(|l| l.fg3m) / fg3a } else { 0.0 },
            three_rate: fg3a / fga,
            ft_rate: sum(|l| l.fta) / fga,
            turnovers: sum(|l| l.tov) / games as f64,
            off_rebounds: sum(|l| l.oreb) / games as f64,
            points: points / games as f64,
            opp_points: opp_points / games as f64,
            recent_net_rating,
            home_net_rating: split(true),
            road_net_rating: split(false),
        })
    }

    pub fn net_rating(&self) -> f64 {
        self.off_rating - self.def_rating
    }
}

fn net_rating_of<'a>(lines: impl Iterator<Item = &'a GameLine>) -> Option<f64> {
    let (points, opp_points, possessions) =
        lines.fold((0.0, 0.0, 0.0), |(p, o, poss), l| {
            (p + l.points as f64, o + l.opp_points as f64, poss + l.possessions())
        });
    if possessions <= 0.0 {
        return None;
    }
    Some(100.0 * (points - opp_points) / possessions)
}

/// Baselines every factor compares a matchup against
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeagueAverages {
    pub pace: f64,
    pub off_rating: f64,
    pub def_rating: f64,
    pub efg_pct: f64,
    pub three_pct: f64,
    pub three_rate: f64,
    pub ft_rate: f64,
    pub turnovers: f64,
    pub off_rebounds: f64,
}

impl Default for LeagueAverages {
    fn default() -> Self {
        Self {
            pace: 99.0,
            off_rating: 115.0,
            def_rating: 115.0,
            efg_pct: 0.545,
            three_pct: 0.36,
            three_rate: 0.40,
            ft_rate: 0.25,
            turnovers: 14.0,
            off_rebounds: 11.0,
        }
    }
}

/// Injury assessment for both teams. Impacts are expected points lost.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InjuryReport {
    pub away_impact: f64,
    pub home_impact: f64,
    pub away_out: Vec<String>,
    pub home_out: Vec<String>,
    pub summary: String,
}

/// Everything a factor reads
#[derive(Debug, Clone)]
pub struct StatsBundle {
    pub sport: Sport,
    pub game: Game,
    pub away: TeamStats,
    pub home: TeamStats,
    pub league: LeagueAverages,
    pub market: MarketLine,
    pub injuries: Option<InjuryReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PickStatus {
    Pending,
    Won,
    Lost,
    Push,
}

/// A generated betting recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pick {
    pub id: Uuid,
    pub run_id: Uuid,
    pub capper_id: String,
    pub game_id: String,
    pub sport: Sport,
    pub bet_type: BetType,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
    pub selection: Side,
    pub line: f64,
    pub odds: i32,
    pub units: u8,
    pub confidence: f64,
    pub predicted_value: f64,
    pub market_value: f64,
    pub edge: f64,
    pub model_prob: f64,
    pub expected_value: f64,
    pub insight: Option<String>,
    pub status: PickStatus,
    pub profit_units: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Pick {
    /// "OVER 228.5", "Boston Celtics -5.5"
    pub fn selection_label(&self) -> String {
        match self.selection {
            Side::Over | Side::Under => format!("{} {:.1}", self.selection, self.line),
            Side::Home => format!("{} {:+.1}", self.home_team, self.line),
            Side::Away => format!("{} {:+.1}", self.away_team, self.line),
        }
    }

    /// Format the pick as a readable string
    pub fn format(&self) -> String {
        format!(
            "{} @ {} | {} ({:+}) | {}u | Confidence: {:.1} | Edge: {:+.1} | Model: {:.1}% | EV: {:+.2}%",
            self.away_team,
            self.home_team,
            self.selection_label(),
            self.odds,
            self.units,
            self.confidence,
            self.edge,
            self.model_prob * 100.0,
            self.expected_value * 100.0
        )
    }
}
