pub mod api;
pub mod cappers;
pub mod config;
pub mod error;
pub mod factors;
pub mod models;
pub mod shiva;
pub mod store;
pub mod utils;

pub use api::*;
pub use models::*;
pub use utils::*;

use anyhow::{Context, Result};
use api::game_results_api::GameResultsApiClient;
use api::llm::{LlmClient, LlmConfig, TextCompletion};
use api::odds_api::OddsApiClient;
use api::stats_api::MySportsFeedsClient;
use cappers::{load_cappers, Capper};
use chrono::NaiveDate;
use config::AppConfig;
use factors::FactorRegistry;
use shiva::{Shiva, ShivaOptions};
use std::sync::Arc;
use store::{JsonFileStore, PickStore};
use utils::data::{load_from_cache, save_to_cache};
use utils::grading::grade_picks;

/// Upcoming NBA games with their consensus market, from the API or the cache
pub async fn fetch_slate(config: &AppConfig, use_cache: bool) -> Result<Vec<(Game, MarketLine)>> {
    let cache_file = config.odds_cache_file();

    let games_with_odds: Vec<(Game, Vec<BettingOdds>)> = if use_cache && cache_file.exists() {
        tracing::info!("Loading odds from cache file: {}", cache_file.display());
        load_from_cache(&cache_file)?
    } else {
        let odds_client = OddsApiClient::new(config.odds_api_key()?.to_string());
        let games_with_odds = odds_client
            .fetch_games(Sport::Nba)
            .await
            .context("Failed to fetch NBA odds")?;
        save_to_cache(&games_with_odds, &cache_file)?;
        tracing::info!("Saved odds to cache file: {}", cache_file.display());
        games_with_odds
    };

    Ok(games_with_odds
        .into_iter()
        .map(|(game, odds)| {
            let market = MarketLine::consensus(&game, &odds);
            (game, market)
        })
        .collect())
}

/// The configured LLM, if a provider is set
pub fn build_llm(config: &AppConfig) -> Result<Option<Arc<dyn TextCompletion>>> {
    let Some(provider) = config.llm_provider else {
        return Ok(None);
    };
    let client = LlmClient::new(LlmConfig::from_env(provider)?)?;
    tracing::info!("Using {} for injury reports and insights", provider);
    Ok(Some(Arc::new(client)))
}

/// The pick wizard wired to MySportsFeeds, the JSON store and the optional LLM
pub fn build_shiva(config: &AppConfig) -> Result<Shiva> {
    let stats = MySportsFeedsClient::new(
        config.msf_api_key()?.to_string(),
        config.msf_season.clone(),
    );
    let store: Arc<dyn PickStore> = Arc::new(JsonFileStore::new(&config.store_dir));
    let options = ShivaOptions {
        recent_games: config.recent_games,
        generate_insight: config.generate_insight,
        ..ShivaOptions::default()
    };

    let mut shiva =
        Shiva::new(FactorRegistry::with_defaults(), Arc::new(stats), store).with_options(options);
    if let Some(llm) = build_llm(config)? {
        shiva = shiva.with_llm(llm);
    }
    Ok(shiva)
}

/// Capper profiles from `CAPPERS_FILE`, or the built-in SHIVA capper
pub fn load_capper_profiles(config: &AppConfig, registry: &FactorRegistry) -> Result<Vec<Capper>> {
    match &config.cappers_file {
        Some(path) => load_cappers(path, registry),
        None => {
            let capper = Capper::shiva();
            capper.validate(registry)?;
            Ok(vec![capper])
        }
    }
}

/// Grade pending picks against the final scores of `date`.
/// Returns how many picks were graded.
pub async fn grade_stored_picks(
    config: &AppConfig,
    store: &dyn PickStore,
    date: NaiveDate,
) -> Result<usize> {
    let results_client = GameResultsApiClient::new(config.balldontlie_api_key()?.to_string());
    let scores = results_client
        .fetch_final_scores(date)
        .await
        .context("Failed to fetch NBA game results")?;
    tracing::info!("{} final scores for {}", scores.len(), date);

    let mut picks = store.list_picks(None).await?;
    let before = picks.clone();
    let graded = grade_picks(&mut picks, &scores);

    for (pick, old) in picks.iter().zip(&before) {
        if pick != old {
            store.update_pick(pick).await?;
        }
    }
    Ok(graded)
}
