//! NBA spread factors. Positive = Away.

use super::injury::InjuryAvailability;
use super::{Factor, Measure, StatDiffFactor};
use crate::models::{BetType, StatsBundle};

const NET_RATING_SCALE: f64 = 6.0;
const TURNOVER_SCALE: f64 = 3.0;
const EFG_SCALE: f64 = 0.03;
const REBOUND_SCALE: f64 = 3.0;
const FORM_SCALE: f64 = 8.0;

pub fn factors() -> Vec<Box<dyn Factor>> {
    vec![
        Box::new(StatDiffFactor {
            key: "net_rating_diff",
            name: "Net Rating Differential",
            bet_type: BetType::Spread,
            scale: NET_RATING_SCALE,
            measure: net_rating_diff,
        }),
        Box::new(StatDiffFactor {
            key: "turnover_diff",
            name: "Turnover Differential",
            bet_type: BetType::Spread,
            scale: TURNOVER_SCALE,
            measure: turnover_diff,
        }),
        Box::new(StatDiffFactor {
            key: "shooting_efficiency",
            name: "Shooting Efficiency",
            bet_type: BetType::Spread,
            scale: EFG_SCALE,
            measure: shooting_efficiency,
        }),
        Box::new(StatDiffFactor {
            key: "rebounding_diff",
            name: "Offensive Rebounding",
            bet_type: BetType::Spread,
            scale: REBOUND_SCALE,
            measure: rebounding_diff,
        }),
        Box::new(StatDiffFactor {
            key: "recent_form",
            name: "Momentum",
            bet_type: BetType::Spread,
            scale: FORM_SCALE,
            measure: recent_form,
        }),
        Box::new(StatDiffFactor {
            key: "home_away_split",
            name: "Home/Away Split",
            bet_type: BetType::Spread,
            scale: FORM_SCALE,
            measure: home_away_split,
        }),
        Box::new(InjuryAvailability::new(BetType::Spread)),
    ]
}

fn net_rating_diff(b: &StatsBundle) -> Option<Measure> {
    let away = b.away.net_rating();
    let home = b.home.net_rating();
    Some(Measure {
        diff: away - home,
        inputs: vec![("away_net", away), ("home_net", home)],
    })
}

/// Fewer giveaways by the away team favour the away side
fn turnover_diff(b: &StatsBundle) -> Option<Measure> {
    Some(Measure {
        diff: b.home.turnovers - b.away.turnovers,
        inputs: vec![
            ("away_tov", b.away.turnovers),
            ("home_tov", b.home.turnovers),
        ],
    })
}

fn shooting_efficiency(b: &StatsBundle) -> Option<Measure> {
    Some(Measure {
        diff: b.away.efg_pct - b.home.efg_pct,
        inputs: vec![("away_efg", b.away.efg_pct), ("home_efg", b.home.efg_pct)],
    })
}

fn rebounding_diff(b: &StatsBundle) -> Option<Measure> {
    Some(Measure {
        diff: b.away.off_rebounds - b.home.off_rebounds,
        inputs: vec![
            ("away_oreb", b.away.off_rebounds),
            ("home_oreb", b.home.off_rebounds),
        ],
    })
}

fn recent_form(b: &StatsBundle) -> Option<Measure> {
    let away = b.away.recent_net_rating?;
    let home = b.home.recent_net_rating?;
    Some(Measure {
        diff: away - home,
        inputs: vec![("away_recent_net", away), ("home_recent_net", home)],
    })
}

/// Away team on the road against home team at home
fn home_away_split(b: &StatsBundle) -> Option<Measure> {
    let away = b.away.road_net_rating?;
    let home = b.home.home_net_rating?;
    Some(Measure {
        diff: away - home,
        inputs: vec![("away_road_net", away), ("home_home_net", home)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::test_support::{average_team, bundle};

    fn compute(key: &str, b: &StatsBundle) -> crate::factors::FactorSignal {
        factors()
            .into_iter()
            .find(|f| f.key() == key)
            .unwrap()
            .compute(b)
            .unwrap()
    }

    #[test]
    fn test_better_away_team_is_positive() {
        let mut away = average_team("NYK");
        away.off_rating = 121.0;
        let b = bundle(away, average_team("BOS"));
        let signal = compute("net_rating_diff", &b);
        assert!((signal.signal - 1.0f64.tanh()).abs() < 1e-9);
        assert_eq!(signal.inputs.get("away_net"), Some(&6.0));
    }

    #[test]
    fn test_home_turnovers_favour_away() {
        let mut home = average_team("BOS");
        home.turnovers = 17.0;
        let b = bundle(average_team("NYK"), home);
        assert!(compute("turnover_diff", &b).signal > 0.7);
    }

    #[test]
    fn test_better_home_shooting_is_negative() {
        let mut home = average_team("BOS");
        home.efg_pct = 0.575;
        let b = bundle(average_team("NYK"), home);
        assert!(compute("shooting_efficiency", &b).signal < -0.7);
    }

    #[test]
    fn test_missing_splits_are_neutral() {
        let mut away = average_team("NYK");
        away.road_net_rating = None;
        away.recent_net_rating = None;
        let b = bundle(away, average_team("BOS"));
        for key in ["home_away_split", "recent_form"] {
            let signal = compute(key, &b);
            assert_eq!(signal.signal, 0.0);
            assert_eq!(signal.note.as_deref(), Some("insufficient data"));
        }
    }

    #[test]
    fn test_split_uses_road_and_home_ratings() {
        let mut away = average_team("NYK");
        away.road_net_rating = Some(-4.0);
        let mut home = average_team("BOS");
        home.home_net_rating = Some(4.0);
        let b = bundle(away, home);
        let signal = compute("home_away_split", &b);
        assert!((signal.signal - (-1.0f64).tanh()).abs() < 1e-9);
    }
}
