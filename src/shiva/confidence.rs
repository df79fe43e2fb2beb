//! Confidence calculator: weighted factor signals → confidence → unit size.

use crate::factors::FactorSignal;
use crate::models::{BetType, Side};
use serde::{Deserialize, Serialize};

/// Points a factor is worth at full signal and 100% weight
pub const MAX_POINTS: f64 = 5.0;
pub const MAX_CONFIDENCE: f64 = 10.0;
/// Edge vs Market is always applied at this weight, outside the capper budget
pub const EDGE_WEIGHT: f64 = 100.0;

/// (minimum confidence, units), checked top down
pub const UNIT_THRESHOLDS: [(f64, u8); 5] = [(9.0, 5), (8.0, 4), (7.0, 3), (6.0, 2), (5.0, 1)];

/// One factor's signal and what it is worth under the capper's weight
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactorContribution {
    pub signal: FactorSignal,
    pub weight: f64,
    pub points: f64,
}

impl FactorContribution {
    pub fn new(signal: FactorSignal, weight: f64) -> Self {
        let points = signal.signal.abs() * MAX_POINTS * weight / 100.0;
        Self {
            signal,
            weight,
            points,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.signal.signal > 0.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceBreakdown {
    /// Points for Over / Away
    pub positive_score: f64,
    /// Points for Under / Home
    pub negative_score: f64,
    pub net: f64,
    pub confidence: f64,
    pub side: Option<Side>,
}

impl ConfidenceBreakdown {
    pub fn units(&self) -> Option<u8> {
        self.side.and(units_for(self.confidence))
    }
}

pub fn calculate(bet_type: BetType, contributions: &[FactorContribution]) -> ConfidenceBreakdown {
    let (positive_score, negative_score) =
        contributions
            .iter()
            .fold((0.0, 0.0), |(pos, neg), c| match c.signal.signal {
                s if s > 0.0 => (pos + c.points, neg),
                s if s < 0.0 => (pos, neg + c.points),
                _ => (pos, neg),
            });

    let net = positive_score - negative_score;
    ConfidenceBreakdown {
        positive_score,
        negative_score,
        net,
        confidence: net.abs().min(MAX_CONFIDENCE),
        side: Side::from_signal(bet_type, net),
    }
}

/// Unit size for a confidence, `None` means PASS
pub fn units_for(confidence: f64) -> Option<u8> {
    UNIT_THRESHOLDS
        .iter()
        .find(|(min, _)| confidence >= *min)
        .map(|(_, units)| *units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn contribution(key: &str, signal: f64, weight: f64) -> FactorContribution {
        FactorContribution::new(
            FactorSignal {
                key: key.to_string(),
                name: key.to_string(),
                signal,
                inputs: BTreeMap::new(),
                note: None,
            },
            weight,
        )
    }

    #[test]
    fn test_points() {
        let c = contribution("pace_index", -0.5, 40.0);
        assert!((c.points - 1.0).abs() < 1e-12);
        assert!(!c.is_positive());
    }

    #[test]
    fn test_calculate_nets_both_sides() {
        let breakdown = calculate(
            BetType::Total,
            &[
                contribution("a", 0.8, 100.0), // 4.0 over
                contribution("b", 0.6, 100.0), // 3.0 over
                contribution("c", -0.4, 50.0), // 1.0 under
                contribution("d", 0.0, 100.0),
            ],
        );
        assert!((breakdown.positive_score - 7.0).abs() < 1e-12);
        assert!((breakdown.negative_score - 1.0).abs() < 1e-12);
        assert!((breakdown.confidence - 6.0).abs() < 1e-12);
        assert_eq!(breakdown.side, Some(Side::Over));
        assert_eq!(breakdown.units(), Some(2));
    }

    #[test]
    fn test_confidence_is_capped() {
        let breakdown = calculate(
            BetType::Spread,
            &[
                contribution("a", -1.0, 100.0),
                contribution("b", -1.0, 100.0),
                contribution("c", -1.0, 100.0),
            ],
        );
        assert_eq!(breakdown.confidence, MAX_CONFIDENCE);
        assert_eq!(breakdown.side, Some(Side::Home));
        assert_eq!(breakdown.units(), Some(5));
    }

    #[test]
    fn test_balanced_signals_pass() {
        let breakdown = calculate(
            BetType::Spread,
            &[contribution("a", 0.5, 100.0), contribution("b", -0.5, 100.0)],
        );
        assert_eq!(breakdown.side, None);
        assert_eq!(breakdown.units(), None);
    }

    #[test]
    fn test_units_for() {
        assert_eq!(units_for(9.5), Some(5));
        assert_eq!(units_for(9.0), Some(5));
        assert_eq!(units_for(8.99), Some(4));
        assert_eq!(units_for(7.0), Some(3));
        assert_eq!(units_for(6.2), Some(2));
        assert_eq!(units_for(5.0), Some(1));
        assert_eq!(units_for(4.99), None);
        assert_eq!(units_for(0.0), None);
    }
}
