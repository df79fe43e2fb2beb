use crate::error::ShivaError;
use crate::factors::{FactorRegistry, EDGE_VS_MARKET_KEY};
use crate::models::{BetType, Sport};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Enabled weights of one bet type must add up to this many percent
pub const WEIGHT_BUDGET: f64 = 250.0;
const BUDGET_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactorWeight {
    pub key: String,
    /// Percentage, 0-100
    pub weight: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl FactorWeight {
    pub fn new(key: &str, weight: f64) -> Self {
        Self {
            key: key.to_string(),
            weight,
            enabled: true,
        }
    }
}

/// A betting personality: which factors it trusts and how much
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Capper {
    pub id: String,
    pub name: String,
    pub sport: Sport,
    pub weights: BTreeMap<BetType, Vec<FactorWeight>>,
}

impl Capper {
    /// The house capper, SHIVA
    pub fn shiva() -> Self {
        let mut weights = BTreeMap::new();
        weights.insert(
            BetType::Total,
            vec![
                FactorWeight::new("pace_index", 60.0),
                FactorWeight::new("offensive_form", 50.0),
                FactorWeight::new("defensive_erosion", 40.0),
                FactorWeight::new("three_point_env", 40.0),
                FactorWeight::new("whistle_env", 20.0),
                FactorWeight::new("injury_totals", 40.0),
            ],
        );
        weights.insert(
            BetType::Spread,
            vec![
                FactorWeight::new("net_rating_diff", 70.0),
                FactorWeight::new("turnover_diff", 30.0),
                FactorWeight::new("shooting_efficiency", 40.0),
                FactorWeight::new("rebounding_diff", 20.0),
                FactorWeight::new("recent_form", 30.0),
                FactorWeight::new("home_away_split", 20.0),
                FactorWeight::new("injury_spread", 40.0),
            ],
        );

        Self {
            id: "shiva".to_string(),
            name: "SHIVA".to_string(),
            sport: Sport::Nba,
            weights,
        }
    }

    pub fn bet_types(&self) -> impl Iterator<Item = BetType> + '_ {
        self.weights.keys().copied()
    }

    /// Enabled weights for a bet type
    pub fn weights_for(&self, bet_type: BetType) -> Result<Vec<&FactorWeight>, ShivaError> {
        let weights = self
            .weights
            .get(&bet_type)
            .ok_or_else(|| ShivaError::BetTypeNotConfigured {
                capper: self.id.clone(),
                bet_type,
            })?;
        Ok(weights.iter().filter(|w| w.enabled).collect())
    }

    pub fn validate(&self, registry: &FactorRegistry) -> Result<(), ShivaError> {
        for (bet_type, weights) in &self.weights {
            let bet_type = *bet_type;
            let mut seen = HashSet::new();
            for w in weights {
                if w.key == EDGE_VS_MARKET_KEY {
                    return Err(ShivaError::FixedFactorWeighted {
                        capper: self.id.clone(),
                        key: w.key.clone(),
                    });
                }
                if !seen.insert(w.key.as_str()) {
                    return Err(ShivaError::DuplicateWeight {
                        capper: self.id.clone(),
                        key: w.key.clone(),
                    });
                }
                if !w.weight.is_finite() || !(0.0..=100.0).contains(&w.weight) {
                    return Err(ShivaError::InvalidWeight {
                        capper: self.id.clone(),
                        key: w.key.clone(),
                        weight: w.weight,
                    });
                }
                registry.require(self.sport, bet_type, &w.key)?;
            }

            let enabled = self.weights_for(bet_type)?;
            if enabled.is_empty() {
                return Err(ShivaError::NoEnabledFactors {
                    capper: self.id.clone(),
                    bet_type,
                });
            }
            let total: f64 = enabled.iter().map(|w| w.weight).sum();
            if (total - WEIGHT_BUDGET).abs() > BUDGET_TOLERANCE {
                return Err(ShivaError::WeightBudget {
                    capper: self.id.clone(),
                    bet_type,
                    total,
                    budget: WEIGHT_BUDGET,
                });
            }
        }
        Ok(())
    }
}

/// Load capper profiles from a JSON array and validate every one
pub fn load_cappers(path: impl AsRef<Path>, registry: &FactorRegistry) -> Result<Vec<Capper>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read capper file {}", path.display()))?;
    let cappers: Vec<Capper> =
        serde_json::from_str(&json).context("Failed to deserialize capper profiles")?;

    for capper in &cappers {
        capper
            .validate(registry)
            .with_context(|| format!("Invalid capper profile '{}'", capper.id))?;
    }
    tracing::info!("Loaded {} capper profiles from {}", cappers.len(), path.display());
    Ok(cappers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> FactorRegistry {
        FactorRegistry::with_defaults()
    }

    fn totals_weights(capper: &mut Capper) -> &mut Vec<FactorWeight> {
        capper.weights.get_mut(&BetType::Total).unwrap()
    }

    #[test]
    fn test_shiva_is_valid() {
        let capper = Capper::shiva();
        assert_eq!(capper.validate(&registry()), Ok(()));
        assert_eq!(capper.bet_types().count(), 2);
    }

    #[test]
    fn test_budget_enforced() {
        let mut capper = Capper::shiva();
        totals_weights(&mut capper)[0].weight = 70.0;
        assert!(matches!(
            capper.validate(&registry()),
            Err(ShivaError::WeightBudget { total, .. }) if (total - 260.0).abs() < 1e-9
        ));
    }

    #[test]
    fn test_disabled_weights_leave_budget() {
        let mut capper = Capper::shiva();
        let weights = totals_weights(&mut capper);
        weights[5].enabled = false; // injury_totals, 40
        weights[0].weight = 100.0; // pace_index 60 -> 100
        assert_eq!(capper.validate(&registry()), Ok(()));
        assert_eq!(capper.weights_for(BetType::Total).unwrap().len(), 5);
    }

    #[test]
    fn test_rejects_bad_profiles() {
        let mut capper = Capper::shiva();
        totals_weights(&mut capper).push(FactorWeight::new("moon_phase", 0.0));
        assert!(matches!(
            capper.validate(&registry()),
            Err(ShivaError::UnknownFactor { .. })
        ));

        let mut capper = Capper::shiva();
        totals_weights(&mut capper).push(FactorWeight::new("pace_index", 0.0));
        assert!(matches!(
            capper.validate(&registry()),
            Err(ShivaError::DuplicateWeight { .. })
        ));

        let mut capper = Capper::shiva();
        totals_weights(&mut capper).push(FactorWeight::new(EDGE_VS_MARKET_KEY, 0.0));
        assert!(matches!(
            capper.validate(&registry()),
            Err(ShivaError::FixedFactorWeighted { .. })
        ));

        let mut capper = Capper::shiva();
        totals_weights(&mut capper)[1].weight = 120.0;
        assert!(matches!(
            capper.validate(&registry()),
            Err(ShivaError::InvalidWeight { .. })
        ));

        let mut capper = Capper::shiva();
        for w in totals_weights(&mut capper) {
            w.enabled = false;
        }
        assert!(matches!(
            capper.validate(&registry()),
            Err(ShivaError::NoEnabledFactors { .. })
        ));
    }

    #[test]
    fn test_unconfigured_bet_type() {
        let mut capper = Capper::shiva();
        capper.weights.remove(&BetType::Spread);
        assert!(capper.validate(&registry()).is_ok());
        assert!(matches!(
            capper.weights_for(BetType::Spread),
            Err(ShivaError::BetTypeNotConfigured { .. })
        ));
    }

    #[test]
    fn test_profiles_round_trip_through_json() {
        let json = serde_json::to_string(&vec![Capper::shiva()]).unwrap();
        assert!(json.contains("\"TOTAL\""));
        let dir = std::env::temp_dir().join(format!("cappers-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cappers.json");
        std::fs::write(&path, json).unwrap();

        let cappers = load_cappers(&path, &registry()).unwrap();
        assert_eq!(cappers, vec![Capper::shiva()]);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_enabled_defaults_to_true() {
        let w: FactorWeight = serde_json::from_str(r#"{"key":"pace_index","weight":50}"#).unwrap();
        assert!(w.enabled);
    }
}
