pub mod game_results_api;
pub mod llm;
pub mod odds_api;
pub mod stats_api;
