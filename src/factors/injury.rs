use super::{tanh_signal, Factor, FactorSignal};
use crate::error::ShivaError;
use crate::models::{BetType, StatsBundle};

/// Points of combined lost scoring that saturate the totals signal
const TOTALS_IMPACT_SCALE: f64 = 6.0;
/// Points of net impact difference that saturate the spread signal
const SPREAD_IMPACT_SCALE: f64 = 4.0;

/// Scores missing players from the LLM injury report.
///
/// Totals: lost scoring on either side leans Under.
/// Spread: the more depleted team loses the signal.
pub struct InjuryAvailability {
    bet_type: BetType,
}

impl InjuryAvailability {
    pub fn new(bet_type: BetType) -> Self {
        Self { bet_type }
    }
}

impl Factor for InjuryAvailability {
    fn key(&self) -> &'static str {
        match self.bet_type {
            BetType::Total => "injury_totals",
            BetType::Spread => "injury_spread",
        }
    }

    fn name(&self) -> &'static str {
        "Injury Availability"
    }

    fn bet_type(&self) -> BetType {
        self.bet_type
    }

    fn uses_injuries(&self) -> bool {
        true
    }

    fn compute(&self, bundle: &StatsBundle) -> Result<FactorSignal, ShivaError> {
        let Some(report) = &bundle.injuries else {
            return Ok(FactorSignal::neutral(self, "no injury data"));
        };

        let signal = match self.bet_type {
            BetType::Total => tanh_signal(
                -(report.away_impact + report.home_impact),
                TOTALS_IMPACT_SCALE,
            ),
            BetType::Spread => tanh_signal(
                report.home_impact - report.away_impact,
                SPREAD_IMPACT_SCALE,
            ),
        };

        Ok(FactorSignal::new(self, signal)
            .with_input("away_impact", report.away_impact)
            .with_input("home_impact", report.home_impact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::test_support::{average_team, bundle};
    use crate::models::InjuryReport;

    fn with_report(away_impact: f64, home_impact: f64) -> StatsBundle {
        let mut b = bundle(average_team("NYK"), average_team("BOS"));
        b.injuries = Some(InjuryReport {
            away_impact,
            home_impact,
            ..Default::default()
        });
        b
    }

    #[test]
    fn test_no_report_is_neutral() {
        let b = bundle(average_team("NYK"), average_team("BOS"));
        let signal = InjuryAvailability::new(BetType::Total).compute(&b).unwrap();
        assert_eq!(signal.signal, 0.0);
        assert_eq!(signal.note.as_deref(), Some("no injury data"));
    }

    #[test]
    fn test_injuries_lean_under() {
        let signal = InjuryAvailability::new(BetType::Total)
            .compute(&with_report(3.0, 3.0))
            .unwrap();
        assert!((signal.signal - (-1.0f64).tanh()).abs() < 1e-9);
    }

    #[test]
    fn test_depleted_home_team_favours_away() {
        let factor = InjuryAvailability::new(BetType::Spread);
        assert_eq!(factor.key(), "injury_spread");
        assert!(factor.compute(&with_report(0.0, 6.0)).unwrap().signal > 0.9);
        assert!(factor.compute(&with_report(6.0, 0.0)).unwrap().signal < -0.9);
        assert_eq!(factor.compute(&with_report(2.0, 2.0)).unwrap().signal, 0.0);
    }
}
