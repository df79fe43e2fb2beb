use crate::api::llm::LlmProvider;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Settings read from the environment (and `.env`)
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub odds_api_key: Option<String>,
    pub msf_api_key: Option<String>,
    /// MySportsFeeds season slug
    pub msf_season: String,
    pub balldontlie_api_key: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub generate_insight: bool,
    pub recent_games: usize,
    pub cache_dir: PathBuf,
    pub store_dir: PathBuf,
    /// JSON capper profiles; the built-in SHIVA capper when unset
    pub cappers_file: Option<PathBuf>,
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            odds_api_key: None,
            msf_api_key: None,
            msf_season: "current".to_string(),
            balldontlie_api_key: None,
            llm_provider: None,
            generate_insight: true,
            recent_games: 10,
            cache_dir: PathBuf::from("cache"),
            store_dir: PathBuf::from("cache/store"),
            cappers_file: None,
            bind_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let llm_provider = get("LLM_PROVIDER")
            .map(|p| p.parse::<LlmProvider>())
            .transpose()
            .context("Invalid LLM_PROVIDER")?;
        let recent_games = match get("RECENT_GAMES") {
            Some(n) => n
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .with_context(|| format!("RECENT_GAMES must be a positive integer, got '{}'", n))?,
            None => defaults.recent_games,
        };
        let generate_insight = match get("GENERATE_INSIGHT") {
            Some(flag) => matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes"),
            None => defaults.generate_insight,
        };

        Ok(Self {
            odds_api_key: get("ODDS_API_KEY"),
            msf_api_key: get("MYSPORTSFEEDS_API_KEY"),
            msf_season: get("MSF_SEASON").unwrap_or(defaults.msf_season),
            balldontlie_api_key: get("BALLDONTLIE_API_KEY"),
            llm_provider,
            generate_insight,
            recent_games,
            cache_dir: get("CACHE_DIR").map(PathBuf::from).unwrap_or(defaults.cache_dir),
            store_dir: get("STORE_DIR").map(PathBuf::from).unwrap_or(defaults.store_dir),
            cappers_file: get("CAPPERS_FILE").map(PathBuf::from),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
        })
    }

    pub fn odds_api_key(&self) -> Result<&str> {
        self.odds_api_key
            .as_deref()
            .context("ODDS_API_KEY not set in .env file")
    }

    pub fn msf_api_key(&self) -> Result<&str> {
        self.msf_api_key
            .as_deref()
            .context("MYSPORTSFEEDS_API_KEY not set in .env file")
    }

    pub fn balldontlie_api_key(&self) -> Result<&str> {
        self.balldontlie_api_key
            .as_deref()
            .context("BALLDONTLIE_API_KEY not set in .env file")
    }

    pub fn odds_cache_file(&self) -> PathBuf {
        self.cache_dir.join("nba_odds_cache.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.odds_api_key().is_err());
        assert_eq!(config.odds_cache_file(), PathBuf::from("cache/nba_odds_cache.json"));
    }

    #[test]
    fn test_reads_variables() {
        let config = config(&[
            ("ODDS_API_KEY", "odds"),
            ("MYSPORTSFEEDS_API_KEY", " msf "),
            ("MSF_SEASON", "2025-2026-regular"),
            ("LLM_PROVIDER", "perplexity"),
            ("GENERATE_INSIGHT", "false"),
            ("RECENT_GAMES", "15"),
            ("STORE_DIR", "/tmp/shiva"),
            ("CAPPERS_FILE", "cappers.json"),
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("BALLDONTLIE_API_KEY", ""),
        ])
        .unwrap();

        assert_eq!(config.odds_api_key().unwrap(), "odds");
        assert_eq!(config.msf_api_key().unwrap(), "msf");
        assert_eq!(config.msf_season, "2025-2026-regular");
        assert_eq!(config.llm_provider, Some(LlmProvider::Perplexity));
        assert!(!config.generate_insight);
        assert_eq!(config.recent_games, 15);
        assert_eq!(config.store_dir, PathBuf::from("/tmp/shiva"));
        assert_eq!(config.cappers_file, Some(PathBuf::from("cappers.json")));
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert!(config.balldontlie_api_key.is_none());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(config(&[("RECENT_GAMES", "0")]).is_err());
        assert!(config(&[("RECENT_GAMES", "ten")]).is_err());
        assert!(config(&[("LLM_PROVIDER", "clippy")]).is_err());
    }
}
