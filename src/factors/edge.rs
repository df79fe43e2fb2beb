use super::{tanh_signal, Factor, FactorSignal};
use crate::error::ShivaError;
use crate::models::{BetType, MarketLine, StatsBundle};
use crate::shiva::prediction::{predict, Prediction};

pub const EDGE_VS_MARKET_KEY: &str = "edge_vs_market";

const TOTAL_EDGE_SCALE: f64 = 6.0;
const SPREAD_EDGE_SCALE: f64 = 4.0;

/// Prediction against the consensus line.
/// For spreads every number is from the home team's perspective:
/// `edge = predicted home margin + home spread`, positive when home covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketEdge {
    pub predicted: f64,
    pub market: f64,
    pub edge: f64,
}

pub fn market_edge(
    bet_type: BetType,
    game_id: &str,
    prediction: &Prediction,
    market: &MarketLine,
) -> Result<MarketEdge, ShivaError> {
    let missing = || ShivaError::MissingMarketLine {
        game_id: game_id.to_string(),
        bet_type,
    };

    match bet_type {
        BetType::Total => {
            let line = market.total.ok_or_else(missing)?;
            Ok(MarketEdge {
                predicted: prediction.total,
                market: line,
                edge: prediction.total - line,
            })
        }
        BetType::Spread => {
            let line = market.spread_home.ok_or_else(missing)?;
            Ok(MarketEdge {
                predicted: prediction.home_margin,
                market: line,
                edge: prediction.home_margin + line,
            })
        }
    }
}

/// The final factor: how far the model sits from the market
pub struct EdgeVsMarket {
    bet_type: BetType,
}

impl EdgeVsMarket {
    pub fn new(bet_type: BetType) -> Self {
        Self { bet_type }
    }

    pub fn signal_for(&self, edge: &MarketEdge) -> f64 {
        match self.bet_type {
            BetType::Total => tanh_signal(edge.edge, TOTAL_EDGE_SCALE),
            // Home covering is a negative (home) signal
            BetType::Spread => -tanh_signal(edge.edge, SPREAD_EDGE_SCALE),
        }
    }
}

impl Factor for EdgeVsMarket {
    fn key(&self) -> &'static str {
        EDGE_VS_MARKET_KEY
    }

    fn name(&self) -> &'static str {
        "Edge vs Market"
    }

    fn bet_type(&self) -> BetType {
        self.bet_type
    }

    fn compute(&self, bundle: &StatsBundle) -> Result<FactorSignal, ShivaError> {
        let prediction = predict(bundle);
        let edge = market_edge(self.bet_type, &bundle.game.id, &prediction, &bundle.market)?;

        Ok(FactorSignal::new(self, self.signal_for(&edge))
            .with_input("predicted", edge.predicted)
            .with_input("market", edge.market)
            .with_input("edge", edge.edge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::test_support::{average_team, bundle};

    #[test]
    fn test_totals_edge() {
        // Two league-average teams project 227.7 against a 225 line
        let b = bundle(average_team("NYK"), average_team("BOS"));
        let signal = EdgeVsMarket::new(BetType::Total).compute(&b).unwrap();
        assert!((signal.inputs["predicted"] - 227.7).abs() < 1e-9);
        assert!((signal.inputs["edge"] - 2.7).abs() < 1e-9);
        assert!((signal.signal - (2.7f64 / 6.0).tanh()).abs() < 1e-9);
    }

    #[test]
    fn test_spread_edge_sign() {
        let mut b = bundle(average_team("NYK"), average_team("BOS"));
        // Home projected by 2.5, laying 2.5: no edge
        let factor = EdgeVsMarket::new(BetType::Spread);
        assert!(factor.compute(&b).unwrap().signal.abs() < 1e-9);

        // Laying 8.5 with a 2.5 projection: away covers
        b.market.spread_home = Some(-8.5);
        let signal = factor.compute(&b).unwrap();
        assert!((signal.inputs["edge"] + 6.0).abs() < 1e-9);
        assert!(signal.signal > 0.9);
    }

    #[test]
    fn test_missing_line() {
        let mut b = bundle(average_team("NYK"), average_team("BOS"));
        b.market.total = None;
        let err = EdgeVsMarket::new(BetType::Total).compute(&b).unwrap_err();
        assert_eq!(
            err,
            ShivaError::MissingMarketLine {
                game_id: "game-1".to_string(),
                bet_type: BetType::Total
            }
        );
    }
}
