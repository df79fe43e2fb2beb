use crate::models::{BetType, Sport};
use thiserror::Error;

/// Errors raised by the scoring pipeline itself (registry, capper profiles,
/// stats aggregation, market data). Collaborator failures travel as
/// `anyhow::Error`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShivaError {
    #[error("factor '{key}' is not registered for {sport} {bet_type}")]
    UnknownFactor {
        sport: Sport,
        bet_type: BetType,
        key: String,
    },

    #[error("factor '{key}' is already registered for {sport} {bet_type}")]
    DuplicateFactor {
        sport: Sport,
        bet_type: BetType,
        key: String,
    },

    #[error("no factors registered for {sport} {bet_type}")]
    NoFactors { sport: Sport, bet_type: BetType },

    #[error("capper '{capper}': weight {weight} for '{key}' is outside 0-100")]
    InvalidWeight {
        capper: String,
        key: String,
        weight: f64,
    },

    #[error("capper '{capper}': {bet_type} weights sum to {total}, expected {budget}")]
    WeightBudget {
        capper: String,
        bet_type: BetType,
        total: f64,
        budget: f64,
    },

    #[error("capper '{capper}': factor '{key}' listed more than once")]
    DuplicateWeight { capper: String, key: String },

    #[error("capper '{capper}': no enabled factors for {bet_type}")]
    NoEnabledFactors { capper: String, bet_type: BetType },

    #[error("capper '{capper}': '{key}' has a fixed weight and cannot be configured")]
    FixedFactorWeighted { capper: String, key: String },

    #[error("capper '{capper}' is not configured for {bet_type}")]
    BetTypeNotConfigured { capper: String, bet_type: BetType },

    #[error("capper '{capper}' covers {capper_sport}, game is {game_sport}")]
    SportMismatch {
        capper: String,
        capper_sport: Sport,
        game_sport: Sport,
    },

    #[error("not enough game logs to build stats for {0}")]
    InsufficientStats(String),

    #[error("no consensus {bet_type} line for game {game_id}")]
    MissingMarketLine { game_id: String, bet_type: BetType },

    #[error("unknown team: {0}")]
    UnknownTeam(String),

    #[error("could not parse LLM response: {0}")]
    LlmResponse(String),
}
