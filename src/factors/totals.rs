//! NBA totals factors. Positive = Over.

use super::injury::InjuryAvailability;
use super::{tanh_signal, Factor, FactorSignal, Measure, StatDiffFactor};
use crate::error::ShivaError;
use crate::models::{BetType, StatsBundle};

const PACE_SCALE: f64 = 4.0;
const RATING_SCALE: f64 = 4.0;
const THREE_PCT_SCALE: f64 = 0.02;
const THREE_RATE_SCALE: f64 = 0.04;
const FT_RATE_SCALE: f64 = 0.04;

pub fn factors() -> Vec<Box<dyn Factor>> {
    vec![
        Box::new(StatDiffFactor {
            key: "pace_index",
            name: "Pace Index",
            bet_type: BetType::Total,
            scale: PACE_SCALE,
            measure: pace_index,
        }),
        Box::new(StatDiffFactor {
            key: "offensive_form",
            name: "Offensive Form",
            bet_type: BetType::Total,
            scale: RATING_SCALE,
            measure: offensive_form,
        }),
        Box::new(StatDiffFactor {
            key: "defensive_erosion",
            name: "Defensive Erosion",
            bet_type: BetType::Total,
            scale: RATING_SCALE,
            measure: defensive_erosion,
        }),
        Box::new(ThreePointEnvironment),
        Box::new(StatDiffFactor {
            key: "whistle_env",
            name: "Free-Throw Environment",
            bet_type: BetType::Total,
            scale: FT_RATE_SCALE,
            measure: whistle_env,
        }),
        Box::new(InjuryAvailability::new(BetType::Total)),
    ]
}

fn average(a: f64, b: f64) -> f64 {
    (a + b) / 2.0
}

fn pace_index(b: &StatsBundle) -> Option<Measure> {
    let pace = average(b.away.pace, b.home.pace);
    Some(Measure {
        diff: pace - b.league.pace,
        inputs: vec![
            ("away_pace", b.away.pace),
            ("home_pace", b.home.pace),
            ("league_pace", b.league.pace),
        ],
    })
}

fn offensive_form(b: &StatsBundle) -> Option<Measure> {
    let ortg = average(b.away.off_rating, b.home.off_rating);
    Some(Measure {
        diff: ortg - b.league.off_rating,
        inputs: vec![
            ("away_ortg", b.away.off_rating),
            ("home_ortg", b.home.off_rating),
            ("league_ortg", b.league.off_rating),
        ],
    })
}

/// Leaky defenses push the total up
fn defensive_erosion(b: &StatsBundle) -> Option<Measure> {
    let drtg = average(b.away.def_rating, b.home.def_rating);
    Some(Measure {
        diff: drtg - b.league.def_rating,
        inputs: vec![
            ("away_drtg", b.away.def_rating),
            ("home_drtg", b.home.def_rating),
            ("league_drtg", b.league.def_rating),
        ],
    })
}

fn whistle_env(b: &StatsBundle) -> Option<Measure> {
    let ft_rate = average(b.away.ft_rate, b.home.ft_rate);
    Some(Measure {
        diff: ft_rate - b.league.ft_rate,
        inputs: vec![
            ("away_ft_rate", b.away.ft_rate),
            ("home_ft_rate", b.home.ft_rate),
            ("league_ft_rate", b.league.ft_rate),
        ],
    })
}

/// Blend of three-point accuracy and volume against the league
pub struct ThreePointEnvironment;

impl Factor for ThreePointEnvironment {
    fn key(&self) -> &'static str {
        "three_point_env"
    }

    fn name(&self) -> &'static str {
        "Three-Point Environment"
    }

    fn bet_type(&self) -> BetType {
        BetType::Total
    }

    fn compute(&self, b: &StatsBundle) -> Result<FactorSignal, ShivaError> {
        let pct_diff = average(b.away.three_pct, b.home.three_pct) - b.league.three_pct;
        let rate_diff = average(b.away.three_rate, b.home.three_rate) - b.league.three_rate;
        let signal = 0.5 * tanh_signal(pct_diff, THREE_PCT_SCALE)
            + 0.5 * tanh_signal(rate_diff, THREE_RATE_SCALE);

        Ok(FactorSignal::new(self, signal)
            .with_input("three_pct_diff", pct_diff)
            .with_input("three_rate_diff", rate_diff))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::test_support::{average_team, bundle};

    fn signal_of(key: &str, b: &StatsBundle) -> f64 {
        factors()
            .iter()
            .find(|f| f.key() == key)
            .unwrap()
            .compute(b)
            .unwrap()
            .signal
    }

    #[test]
    fn test_average_matchup_is_neutral() {
        let b = bundle(average_team("NYK"), average_team("BOS"));
        for factor in factors() {
            let signal = factor.compute(&b).unwrap();
            assert!(signal.signal.abs() < 1e-9, "{} = {}", signal.key, signal.signal);
        }
    }

    #[test]
    fn test_fast_teams_lean_over() {
        let mut away = average_team("NYK");
        away.pace = 103.0;
        let mut home = average_team("BOS");
        home.pace = 103.0;
        let b = bundle(away, home);
        let signal = signal_of("pace_index", &b);
        // diff = 4 → tanh(1)
        assert!((signal - 1.0f64.tanh()).abs() < 1e-9);
    }

    #[test]
    fn test_strong_defenses_lean_under() {
        let mut away = average_team("NYK");
        away.def_rating = 109.0;
        let mut home = average_team("BOS");
        home.def_rating = 111.0;
        let b = bundle(away, home);
        assert!(signal_of("defensive_erosion", &b) < -0.5);
    }

    #[test]
    fn test_three_point_environment_blends() {
        let mut away = average_team("NYK");
        away.three_pct = 0.40;
        let mut home = average_team("BOS");
        home.three_pct = 0.40;
        home.three_rate = 0.30;
        away.three_rate = 0.30;
        let b = bundle(away, home);
        // Hot shooting but low volume roughly cancels
        let signal = signal_of("three_point_env", &b);
        assert!(signal.abs() < 0.05, "{}", signal);
    }

    #[test]
    fn test_measure_inputs_are_recorded() {
        let b = bundle(average_team("NYK"), average_team("BOS"));
        let signal = factors()[0].compute(&b).unwrap();
        assert_eq!(signal.key, "pace_index");
        assert_eq!(signal.inputs.get("league_pace"), Some(&99.0));
        assert_eq!(signal.inputs.get("diff"), Some(&0.0));
    }
}
