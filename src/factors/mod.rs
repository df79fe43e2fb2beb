//! Factor registry.
//!
//! A factor maps a [`StatsBundle`] to a signal in [-1, 1]. Positive signals
//! favour the Over (totals) or the away side (spread), negative signals the
//! Under or the home side. Factors are registered per (sport, bet type) and
//! looked up by key when a capper's weights are applied.

pub mod edge;
pub mod injury;
pub mod spread;
pub mod totals;

use crate::error::ShivaError;
use crate::models::{BetType, Sport, StatsBundle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use edge::{EdgeVsMarket, EDGE_VS_MARKET_KEY};

/// Output of a single factor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactorSignal {
    pub key: String,
    pub name: String,
    pub signal: f64,
    pub inputs: BTreeMap<String, f64>,
    pub note: Option<String>,
}

impl FactorSignal {
    pub fn new(factor: &dyn Factor, signal: f64) -> Self {
        Self {
            key: factor.key().to_string(),
            name: factor.name().to_string(),
            signal: if signal.is_finite() {
                signal.clamp(-1.0, 1.0)
            } else {
                0.0
            },
            inputs: BTreeMap::new(),
            note: None,
        }
    }

    /// A zero signal explaining why the factor could not score
    pub fn neutral(factor: &dyn Factor, note: impl Into<String>) -> Self {
        Self::new(factor, 0.0).with_note(note)
    }

    pub fn with_input(mut self, name: &str, value: f64) -> Self {
        self.inputs.insert(name.to_string(), value);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// A named scoring function
pub trait Factor: Send + Sync {
    fn key(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn bet_type(&self) -> BetType;
    fn compute(&self, bundle: &StatsBundle) -> Result<FactorSignal, ShivaError>;

    /// Whether the orchestrator must fetch an injury report before scoring
    fn uses_injuries(&self) -> bool {
        false
    }
}

/// clamp(tanh(diff / scale), -1, 1)
pub fn tanh_signal(diff: f64, scale: f64) -> f64 {
    if scale <= 0.0 || !diff.is_finite() || !scale.is_finite() {
        return 0.0;
    }
    (diff / scale).tanh().clamp(-1.0, 1.0)
}

/// A differential and the raw numbers it was built from
#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
    pub diff: f64,
    pub inputs: Vec<(&'static str, f64)>,
}

/// The common factor shape: one stat differential squashed through tanh.
/// `measure` returns `None` when the bundle lacks the data it needs.
pub struct StatDiffFactor {
    pub key: &'static str,
    pub name: &'static str,
    pub bet_type: BetType,
    pub scale: f64,
    pub measure: fn(&StatsBundle) -> Option<Measure>,
}

impl Factor for StatDiffFactor {
    fn key(&self) -> &'static str {
        self.key
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn bet_type(&self) -> BetType {
        self.bet_type
    }

    fn compute(&self, bundle: &StatsBundle) -> Result<FactorSignal, ShivaError> {
        let Some(measure) = (self.measure)(bundle) else {
            return Ok(FactorSignal::neutral(self, "insufficient data"));
        };

        let signal = measure
            .inputs
            .iter()
            .fold(
                FactorSignal::new(self, tanh_signal(measure.diff, self.scale)),
                |signal, (name, value)| signal.with_input(name, *value),
            )
            .with_input("diff", measure.diff);

        Ok(signal)
    }
}

/// Factors keyed by (sport, bet type), in registration order
#[derive(Default)]
pub struct FactorRegistry {
    factors: BTreeMap<(Sport, BetType), Vec<Box<dyn Factor>>>,
}

impl FactorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in NBA factor plus Edge vs Market for both bet types
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let builtin = totals::factors()
            .into_iter()
            .chain(spread::factors())
            .chain([
                Box::new(EdgeVsMarket::new(BetType::Total)) as Box<dyn Factor>,
                Box::new(EdgeVsMarket::new(BetType::Spread)),
            ]);

        for factor in builtin {
            // Built-in keys are unique per bet type
            if let Err(e) = registry.register(Sport::Nba, factor) {
                tracing::error!("Skipping built-in factor: {}", e);
            }
        }
        registry
    }

    pub fn register(&mut self, sport: Sport, factor: Box<dyn Factor>) -> Result<(), ShivaError> {
        let bet_type = factor.bet_type();
        let entry = self.factors.entry((sport, bet_type)).or_default();
        if entry.iter().any(|f| f.key() == factor.key()) {
            return Err(ShivaError::DuplicateFactor {
                sport,
                bet_type,
                key: factor.key().to_string(),
            });
        }
        entry.push(factor);
        Ok(())
    }

    pub fn factors_for(
        &self,
        sport: Sport,
        bet_type: BetType,
    ) -> Result<&[Box<dyn Factor>], ShivaError> {
        match self.factors.get(&(sport, bet_type)) {
            Some(factors) if !factors.is_empty() => Ok(factors),
            _ => Err(ShivaError::NoFactors { sport, bet_type }),
        }
    }

    pub fn get(&self, sport: Sport, bet_type: BetType, key: &str) -> Option<&dyn Factor> {
        self.factors
            .get(&(sport, bet_type))?
            .iter()
            .find(|f| f.key() == key)
            .map(|f| f.as_ref())
    }

    pub fn require(
        &self,
        sport: Sport,
        bet_type: BetType,
        key: &str,
    ) -> Result<&dyn Factor, ShivaError> {
        self.get(sport, bet_type, key)
            .ok_or_else(|| ShivaError::UnknownFactor {
                sport,
                bet_type,
                key: key.to_string(),
            })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::{
        Game, LeagueAverages, MarketLine, Sport, StatsBundle, TeamStats,
    };
    use chrono::{TimeZone, Utc};

    /// League-average team: every factor reads zero against it
    pub fn average_team(team: &str) -> TeamStats {
        let league = LeagueAverages::default();
        TeamStats {
            team: team.to_string(),
            games: 10,
            pace: league.pace,
            off_rating: league.off_rating,
            def_rating: league.def_rating,
            efg_pct: league.efg_pct,
            three_pct: league.three_pct,
            three_rate: league.three_rate,
            ft_rate: league.ft_rate,
            turnovers: league.turnovers,
            off_rebounds: league.off_rebounds,
            points: 113.85,
            opp_points: 113.85,
            recent_net_rating: Some(0.0),
            home_net_rating: Some(0.0),
            road_net_rating: Some(0.0),
        }
    }

    pub fn bundle(away: TeamStats, home: TeamStats) -> StatsBundle {
        StatsBundle {
            sport: Sport::Nba,
            game: Game {
                id: "game-1".to_string(),
                sport: Sport::Nba,
                home_team: "Boston Celtics".to_string(),
                away_team: "New York Knicks".to_string(),
                commence_time: Utc.with_ymd_and_hms(2030, 1, 10, 0, 30, 0).unwrap(),
            },
            away,
            home,
            league: LeagueAverages::default(),
            market: MarketLine {
                total: Some(225.0),
                over_price: Some(-110),
                under_price: Some(-110),
                spread_home: Some(-2.5),
                home_spread_price: Some(-110),
                away_spread_price: Some(-110),
                home_moneyline: Some(-135),
                away_moneyline: Some(115),
                bookmakers: 5,
            },
            injuries: None,
        }
    }
}
