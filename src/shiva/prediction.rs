use crate::models::StatsBundle;
use serde::{Deserialize, Serialize};

/// Points of home-court advantage, split half to each side
pub const HOME_COURT_ADVANTAGE: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub away_points: f64,
    pub home_points: f64,
    pub total: f64,
    pub home_margin: f64,
}

/// Project a final score from pace and efficiency.
///
/// Possessions are the product of both paces over league pace; each side's
/// efficiency is its offensive rating adjusted by the opponent's defensive
/// rating relative to the league. Injury impact comes straight off the
/// injured side's points.
pub fn predict(b: &StatsBundle) -> Prediction {
    let league_pace = if b.league.pace > 0.0 {
        b.league.pace
    } else {
        (b.away.pace + b.home.pace) / 2.0
    };
    let league_ortg = if b.league.off_rating > 0.0 {
        b.league.off_rating
    } else {
        (b.away.off_rating + b.home.off_rating) / 2.0
    };

    let possessions = b.away.pace * b.home.pace / league_pace;
    let away_efficiency = b.away.off_rating * b.home.def_rating / league_ortg;
    let home_efficiency = b.home.off_rating * b.away.def_rating / league_ortg;

    let (away_injury, home_injury) = b
        .injuries
        .as_ref()
        .map(|r| (r.away_impact, r.home_impact))
        .unwrap_or((0.0, 0.0));

    let away_points =
        possessions * away_efficiency / 100.0 - HOME_COURT_ADVANTAGE / 2.0 - away_injury;
    let home_points =
        possessions * home_efficiency / 100.0 + HOME_COURT_ADVANTAGE / 2.0 - home_injury;

    Prediction {
        away_points,
        home_points,
        total: away_points + home_points,
        home_margin: home_points - away_points,
    }
}
