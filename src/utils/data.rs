use crate::models::Pick;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Save any serializable data to a pretty JSON cache file
pub fn save_to_cache<T: Serialize + ?Sized>(data: &T, cache_file: impl AsRef<Path>) -> Result<()> {
    let cache_file = cache_file.as_ref();
    if let Some(parent) = cache_file.parent() {
        std::fs::create_dir_all(parent).context("Failed to create cache directory")?;
    }
    let json = serde_json::to_string_pretty(data).context("Failed to serialize cache data")?;
    std::fs::write(cache_file, json)
        .with_context(|| format!("Failed to write cache file {}", cache_file.display()))?;
    Ok(())
}

/// Load data from a JSON cache file
pub fn load_from_cache<T: DeserializeOwned>(cache_file: impl AsRef<Path>) -> Result<T> {
    let cache_file = cache_file.as_ref();
    let json = std::fs::read_to_string(cache_file)
        .with_context(|| format!("Failed to read cache file {}", cache_file.display()))?;
    serde_json::from_str(&json).context("Failed to deserialize cache data")
}

#[derive(Serialize)]
struct PickRow<'a> {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Away Team")]
    away_team: &'a str,
    #[serde(rename = "Home Team")]
    home_team: &'a str,
    #[serde(rename = "Capper")]
    capper: &'a str,
    #[serde(rename = "Bet Type")]
    bet_type: String,
    #[serde(rename = "Selection")]
    selection: String,
    #[serde(rename = "Odds")]
    odds: i32,
    #[serde(rename = "Units")]
    units: u8,
    #[serde(rename = "Confidence")]
    confidence: String,
    #[serde(rename = "Edge")]
    edge: String,
    #[serde(rename = "Model Probability (%)")]
    model_prob: String,
    #[serde(rename = "Expected Value (%)")]
    expected_value: String,
    #[serde(rename = "Status")]
    status: String,
}

/// Save picks to CSV
pub fn save_picks_to_csv(picks: &[Pick], filename: impl AsRef<Path>) -> Result<()> {
    let mut writer = csv::Writer::from_path(filename.as_ref()).context("Failed to create CSV file")?;

    for pick in picks {
        writer.serialize(PickRow {
            date: pick.commence_time.format("%Y-%m-%d").to_string(),
            away_team: &pick.away_team,
            home_team: &pick.home_team,
            capper: &pick.capper_id,
            bet_type: pick.bet_type.to_string(),
            selection: pick.selection_label(),
            odds: pick.odds,
            units: pick.units,
            confidence: format!("{:.1}", pick.confidence),
            edge: format!("{:+.1}", pick.edge),
            model_prob: format!("{:.1}", pick.model_prob * 100.0),
            expected_value: format!("{:.2}", pick.expected_value * 100.0),
            status: format!("{:?}", pick.status).to_uppercase(),
        })?;
    }

    writer.flush().context("Failed to flush CSV file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BetType, PickStatus, Side, Sport};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn pick() -> Pick {
        Pick {
            id: Uuid::new_v4(),
            run_id: Uuid::new_v4(),
            capper_id: "shiva".to_string(),
            game_id: "g1".to_string(),
            sport: Sport::Nba,
            bet_type: BetType::Total,
            home_team: "Boston Celtics".to_string(),
            away_team: "New York Knicks".to_string(),
            commence_time: Utc.with_ymd_and_hms(2026, 1, 10, 0, 30, 0).unwrap(),
            selection: Side::Over,
            line: 224.5,
            odds: -110,
            units: 2,
            confidence: 6.4,
            predicted_value: 229.1,
            market_value: 224.5,
            edge: 4.6,
            model_prob: 0.6,
            expected_value: 0.145,
            insight: None,
            status: PickStatus::Pending,
            profit_units: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 9, 18, 0, 0).unwrap(),
        }
    }

    fn temp_dir() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("shiva-data-{}", Uuid::new_v4()))
    }

    #[test]
    fn test_cache_round_trip_creates_directories() {
        let dir = temp_dir();
        let file = dir.join("nested").join("picks.json");
        save_to_cache(&vec![pick()], &file).unwrap();
        let loaded: Vec<Pick> = load_from_cache(&file).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].line, 224.5);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_load_missing_cache_fails() {
        let result: Result<Vec<Pick>> = load_from_cache(temp_dir().join("missing.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_save_picks_to_csv() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("picks.csv");
        save_picks_to_csv(&[pick()], &file).unwrap();

        let contents = std::fs::read_to_string(&file).unwrap();
        let mut lines = contents.lines();
        assert!(lines.next().unwrap().starts_with("Date,Away Team,Home Team,Capper"));
        assert_eq!(
            lines.next().unwrap(),
            "2026-01-10,New York Knicks,Boston Celtics,shiva,TOTAL,OVER 224.5,-110,2,6.4,+4.6,60.0,14.50,PENDING"
        );
        std::fs::remove_dir_all(dir).ok();
    }
}
