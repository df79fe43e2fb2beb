//! The SHIVA pick wizard.
//!
//! One run takes a capper, a game and a bet type through a fixed sequence
//! of steps and ends in either a PICK (persisted) or a PASS. Every step is
//! recorded on the run so a PASS can always be explained.

pub mod confidence;
pub mod injuries;
pub mod insight;
pub mod prediction;

use crate::api::llm::TextCompletion;
use crate::api::stats_api::StatsProvider;
use crate::cappers::Capper;
use crate::error::ShivaError;
use crate::factors::{FactorRegistry, EDGE_VS_MARKET_KEY};
use crate::models::{
    BetType, Game, LeagueAverages, MarketLine, Pick, PickStatus, Side, StatsBundle,
};
use crate::store::PickStore;
use crate::utils::ev_calculator::{
    calculate_expected_value, calculate_spread_cover_probability, probability_above,
    NBA_MARGIN_STD_DEV, NBA_TOTAL_STD_DEV,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use confidence::{ConfidenceBreakdown, FactorContribution, EDGE_WEIGHT};
use prediction::{predict, Prediction};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    ValidateCapper,
    CheckExisting,
    FetchStats,
    InjuryReport,
    ComputeFactors,
    EdgeVsMarket,
    Confidence,
    Persist,
    Insight,
}

impl WizardStep {
    pub const ALL: [WizardStep; 9] = [
        WizardStep::ValidateCapper,
        WizardStep::CheckExisting,
        WizardStep::FetchStats,
        WizardStep::InjuryReport,
        WizardStep::ComputeFactors,
        WizardStep::EdgeVsMarket,
        WizardStep::Confidence,
        WizardStep::Persist,
        WizardStep::Insight,
    ];
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WizardStep::ValidateCapper => "validate capper",
            WizardStep::CheckExisting => "check existing",
            WizardStep::FetchStats => "fetch stats",
            WizardStep::InjuryReport => "injury report",
            WizardStep::ComputeFactors => "compute factors",
            WizardStep::EdgeVsMarket => "edge vs market",
            WizardStep::Confidence => "confidence",
            WizardStep::Persist => "persist",
            WizardStep::Insight => "insight",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepRecord {
    pub step: WizardStep,
    pub status: StepStatus,
    pub detail: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Decision {
    Pick { pick_id: Uuid, side: Side, units: u8 },
    Pass { reason: String },
}

impl Decision {
    pub fn is_pick(&self) -> bool {
        matches!(self, Decision::Pick { .. })
    }
}

/// Everything one wizard run did
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShivaRun {
    pub run_id: Uuid,
    pub capper_id: String,
    pub game_id: String,
    pub bet_type: BetType,
    pub steps: Vec<StepRecord>,
    pub factors: Vec<FactorContribution>,
    pub prediction: Option<Prediction>,
    pub confidence: Option<ConfidenceBreakdown>,
    pub decision: Decision,
    pub created_at: DateTime<Utc>,
}

impl ShivaRun {
    pub fn step(&self, step: WizardStep) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.step == step)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShivaOptions {
    /// Game logs per team fed into the stats
    pub recent_games: usize,
    pub generate_insight: bool,
    /// Price used when the market has none for the chosen side
    pub default_odds: i32,
}

impl Default for ShivaOptions {
    fn default() -> Self {
        Self {
            recent_games: 10,
            generate_insight: true,
            default_odds: -110,
        }
    }
}

/// Records steps in order, timing each from the end of the previous one
struct StepLog {
    run_id: Uuid,
    records: Vec<StepRecord>,
    since: Instant,
}

impl StepLog {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            records: Vec::new(),
            since: Instant::now(),
        }
    }

    fn record(&mut self, step: WizardStep, status: StepStatus, detail: impl Into<String>) {
        let detail = detail.into();
        let elapsed_ms = self.since.elapsed().as_millis() as u64;
        match status {
            StepStatus::Failed => warn!("[{}] {} failed: {}", self.run_id, step, detail),
            _ => info!("[{}] {} {:?}: {}", self.run_id, step, status, detail),
        }
        self.records.push(StepRecord {
            step,
            status,
            detail,
            elapsed_ms,
        });
        self.since = Instant::now();
    }

    /// Mark every step after the last recorded one as skipped
    fn skip_rest(&mut self, reason: &str) {
        let done = self.records.len();
        for step in WizardStep::ALL.into_iter().skip(done) {
            self.records.push(StepRecord {
                step,
                status: StepStatus::Skipped,
                detail: reason.to_string(),
                elapsed_ms: 0,
            });
        }
    }
}

/// Values a pick records, all from the selected side's perspective
struct PickMetrics {
    line: f64,
    odds: i32,
    predicted_value: f64,
    edge: f64,
    model_prob: f64,
    expected_value: f64,
}

fn pick_metrics(
    side: Side,
    prediction: &Prediction,
    market: &MarketLine,
    default_odds: i32,
    game_id: &str,
) -> Result<PickMetrics, ShivaError> {
    let line = market
        .line_for(side)
        .ok_or_else(|| ShivaError::MissingMarketLine {
            game_id: game_id.to_string(),
            bet_type: side.bet_type(),
        })?;
    let odds = market.price_for(side).unwrap_or(default_odds);

    let (predicted_value, edge, model_prob) = match side {
        Side::Over => (
            prediction.total,
            prediction.total - line,
            probability_above(prediction.total, line, NBA_TOTAL_STD_DEV),
        ),
        Side::Under => (
            prediction.total,
            line - prediction.total,
            1.0 - probability_above(prediction.total, line, NBA_TOTAL_STD_DEV),
        ),
        Side::Home | Side::Away => {
            let margin = if side == Side::Home {
                prediction.home_margin
            } else {
                -prediction.home_margin
            };
            (
                margin,
                margin + line,
                calculate_spread_cover_probability(margin, line, NBA_MARGIN_STD_DEV),
            )
        }
    };

    Ok(PickMetrics {
        line,
        odds,
        predicted_value,
        edge,
        model_prob,
        expected_value: calculate_expected_value(model_prob, odds),
    })
}

pub struct Shiva {
    registry: FactorRegistry,
    stats: Arc<dyn StatsProvider>,
    store: Arc<dyn PickStore>,
    llm: Option<Arc<dyn TextCompletion>>,
    options: ShivaOptions,
}

impl Shiva {
    pub fn new(
        registry: FactorRegistry,
        stats: Arc<dyn StatsProvider>,
        store: Arc<dyn PickStore>,
    ) -> Self {
        Self {
            registry,
            stats,
            store,
            llm: None,
            options: ShivaOptions::default(),
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn TextCompletion>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_options(mut self, options: ShivaOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &FactorRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn PickStore> {
        &self.store
    }

    /// Run the wizard for one game and bet type. The run is saved whatever
    /// the decision; errors are configuration or collaborator failures.
    pub async fn run_game(
        &self,
        capper: &Capper,
        bet_type: BetType,
        game: &Game,
        market: &MarketLine,
    ) -> Result<ShivaRun> {
        let run_id = Uuid::new_v4();
        info!(
            "[{}] {} {} {} @ {}",
            run_id, capper.id, bet_type, game.away_team, game.home_team
        );

        let mut run = ShivaRun {
            run_id,
            capper_id: capper.id.clone(),
            game_id: game.id.clone(),
            bet_type,
            steps: Vec::new(),
            factors: Vec::new(),
            prediction: None,
            confidence: None,
            decision: Decision::Pass {
                reason: String::new(),
            },
            created_at: Utc::now(),
        };
        let mut log = StepLog::new(run_id);

        let decision = self
            .execute(capper, bet_type, game, market, &mut run, &mut log)
            .await?;
        if let Decision::Pass { reason } = &decision {
            log.skip_rest(reason);
            info!("[{}] PASS: {}", run_id, reason);
        }

        run.steps = log.records;
        run.decision = decision;
        self.store
            .save_run(&run)
            .await
            .context("Failed to save wizard run")?;
        Ok(run)
    }

    async fn execute(
        &self,
        capper: &Capper,
        bet_type: BetType,
        game: &Game,
        market: &MarketLine,
        run: &mut ShivaRun,
        log: &mut StepLog,
    ) -> Result<Decision> {
        let pass = |reason: String| -> Result<Decision> { Ok(Decision::Pass { reason }) };

        // 1. Capper
        if capper.sport != game.sport {
            return Err(ShivaError::SportMismatch {
                capper: capper.id.clone(),
                capper_sport: capper.sport,
                game_sport: game.sport,
            }
            .into());
        }
        capper.validate(&self.registry)?;
        let weights = capper.weights_for(bet_type)?;
        log.record(
            WizardStep::ValidateCapper,
            StepStatus::Completed,
            format!("{} factors enabled", weights.len()),
        );

        // 2. Existing pick / started game
        if let Some(existing) = self
            .store
            .find_pick(&capper.id, &game.id, bet_type)
            .await?
        {
            log.record(
                WizardStep::CheckExisting,
                StepStatus::Completed,
                format!("pick {} exists", existing.id),
            );
            return pass("already picked".to_string());
        }
        if game.commence_time <= Utc::now() {
            log.record(WizardStep::CheckExisting, StepStatus::Completed, "game started");
            return pass("game already started".to_string());
        }
        log.record(WizardStep::CheckExisting, StepStatus::Completed, "no pick yet");

        // 3. Stats
        let last_n = self.options.recent_games;
        let away = self
            .stats
            .team_stats(&game.away_team, last_n)
            .await
            .with_context(|| format!("Failed to fetch stats for {}", game.away_team))?;
        let home = self
            .stats
            .team_stats(&game.home_team, last_n)
            .await
            .with_context(|| format!("Failed to fetch stats for {}", game.home_team))?;
        log.record(
            WizardStep::FetchStats,
            StepStatus::Completed,
            format!(
                "{} ({} games, net {:+.1}) vs {} ({} games, net {:+.1})",
                away.team,
                away.games,
                away.net_rating(),
                home.team,
                home.games,
                home.net_rating()
            ),
        );

        let mut bundle = StatsBundle {
            sport: game.sport,
            game: game.clone(),
            away,
            home,
            league: LeagueAverages::default(),
            market: market.clone(),
            injuries: None,
        };

        // 4. Injuries
        let mut factors = Vec::with_capacity(weights.len());
        for w in &weights {
            factors.push((self.registry.require(capper.sport, bet_type, &w.key)?, w.weight));
        }
        let needs_injuries = factors.iter().any(|(f, _)| f.uses_injuries());
        match (&self.llm, needs_injuries) {
            (_, false) => log.record(
                WizardStep::InjuryReport,
                StepStatus::Skipped,
                "no injury factor enabled",
            ),
            (None, true) => {
                log.record(WizardStep::InjuryReport, StepStatus::Skipped, "no LLM configured")
            }
            (Some(llm), true) => match injuries::fetch_injury_report(llm.as_ref(), game).await {
                Ok(report) => {
                    log.record(
                        WizardStep::InjuryReport,
                        StepStatus::Completed,
                        format!(
                            "away -{:.1}, home -{:.1}: {}",
                            report.away_impact, report.home_impact, report.summary
                        ),
                    );
                    bundle.injuries = Some(report);
                }
                Err(e) => log.record(WizardStep::InjuryReport, StepStatus::Failed, format!("{:#}", e)),
            },
        }

        // 5. Capper factors
        for (factor, weight) in factors {
            let signal = factor.compute(&bundle)?;
            debug!(
                "[{}] {} = {:+.3} x {:.0}%",
                run.run_id, signal.key, signal.signal, weight
            );
            run.factors.push(FactorContribution::new(signal, weight));
        }
        log.record(
            WizardStep::ComputeFactors,
            StepStatus::Completed,
            format!("{} factors computed", run.factors.len()),
        );

        // 6. Edge vs Market
        let prediction = predict(&bundle);
        run.prediction = Some(prediction);
        if !market.has_line(bet_type) {
            let missing = ShivaError::MissingMarketLine {
                game_id: game.id.clone(),
                bet_type,
            };
            log.record(WizardStep::EdgeVsMarket, StepStatus::Failed, missing.to_string());
            return pass("no market line".to_string());
        }
        let edge_signal = self
            .registry
            .require(capper.sport, bet_type, EDGE_VS_MARKET_KEY)?
            .compute(&bundle)?;
        let edge_detail = format!(
            "model {:.1} vs market {:.1} (signal {:+.3})",
            edge_signal.inputs.get("predicted").copied().unwrap_or_default(),
            edge_signal.inputs.get("market").copied().unwrap_or_default(),
            edge_signal.signal
        );
        run.factors
            .push(FactorContribution::new(edge_signal, EDGE_WEIGHT));
        log.record(WizardStep::EdgeVsMarket, StepStatus::Completed, edge_detail);

        // 7. Confidence
        let breakdown = confidence::calculate(bet_type, &run.factors);
        let units = breakdown.units();
        run.confidence = Some(breakdown.clone());
        let (side, units) = match (breakdown.side, units) {
            (Some(side), Some(units)) => (side, units),
            _ => {
                log.record(
                    WizardStep::Confidence,
                    StepStatus::Completed,
                    format!("confidence {:.2}", breakdown.confidence),
                );
                return pass(format!(
                    "confidence {:.2} below threshold",
                    breakdown.confidence
                ));
            }
        };
        log.record(
            WizardStep::Confidence,
            StepStatus::Completed,
            format!("{} {:.2} -> {}u", side, breakdown.confidence, units),
        );

        // 8. Persist
        let metrics = pick_metrics(
            side,
            &prediction,
            market,
            self.options.default_odds,
            &game.id,
        )?;
        let mut pick = Pick {
            id: Uuid::new_v4(),
            run_id: run.run_id,
            capper_id: capper.id.clone(),
            game_id: game.id.clone(),
            sport: game.sport,
            bet_type,
            home_team: game.home_team.clone(),
            away_team: game.away_team.clone(),
            commence_time: game.commence_time,
            selection: side,
            line: metrics.line,
            odds: metrics.odds,
            units,
            confidence: breakdown.confidence,
            predicted_value: metrics.predicted_value,
            market_value: metrics.line,
            edge: metrics.edge,
            model_prob: metrics.model_prob,
            expected_value: metrics.expected_value,
            insight: None,
            status: PickStatus::Pending,
            profit_units: None,
            created_at: Utc::now(),
        };
        self.store
            .save_pick(&pick)
            .await
            .context("Failed to save pick")?;
        log.record(WizardStep::Persist, StepStatus::Completed, pick.format());

        // 9. Insight
        match (&self.llm, self.options.generate_insight) {
            (Some(llm), true) => {
                match insight::generate_insight(llm.as_ref(), &pick, &run.factors).await {
                    Ok(text) => {
                        pick.insight = Some(text);
                        match self.store.update_pick(&pick).await {
                            Ok(()) => log.record(
                                WizardStep::Insight,
                                StepStatus::Completed,
                                "insight stored",
                            ),
                            Err(e) => {
                                error!("[{}] Failed to store insight: {:#}", run.run_id, e);
                                log.record(WizardStep::Insight, StepStatus::Failed, format!("{:#}", e))
                            }
                        }
                    }
                    Err(e) => log.record(WizardStep::Insight, StepStatus::Failed, format!("{:#}", e)),
                }
            }
            (None, _) => log.record(WizardStep::Insight, StepStatus::Skipped, "no LLM configured"),
            (Some(_), false) => log.record(WizardStep::Insight, StepStatus::Skipped, "disabled"),
        }

        info!("[{}] PICK: {}", run.run_id, pick.format());
        Ok(Decision::Pick {
            pick_id: pick.id,
            side,
            units,
        })
    }

    /// Every game and bet type the capper covers. Failed games are logged
    /// and skipped.
    pub async fn run_slate(&self, capper: &Capper, slate: &[(Game, MarketLine)]) -> Vec<ShivaRun> {
        let mut runs = Vec::new();
        for (game, market) in slate {
            for bet_type in capper.bet_types() {
                match self.run_game(capper, bet_type, game, market).await {
                    Ok(run) => runs.push(run),
                    Err(e) => error!(
                        "{} {} {} @ {} failed: {:#}",
                        capper.id, bet_type, game.away_team, game.home_team, e
                    ),
                }
            }
        }

        let picks = runs.iter().filter(|r| r.decision.is_pick()).count();
        info!(
            "{}: {} runs over {} games, {} picks",
            capper.id,
            runs.len(),
            slate.len(),
            picks
        );
        runs
    }
}
