use crate::api::llm::{complete_json, TextCompletion};
use crate::error::ShivaError;
use crate::models::{Game, InjuryReport};
use anyhow::Result;
use serde_json::Value;

/// Most points an injury report may take off one team
pub const MAX_INJURY_IMPACT: f64 = 15.0;

const SYSTEM_PROMPT: &str = "You are an NBA injury analyst. Use the latest injury reports \
and rotation news. Reply with a single JSON object and nothing else.";

pub fn build_prompt(game: &Game) -> String {
    format!(
        "Game: {away} at {home}, tip-off {tip} UTC.\n\
         List the players ruled out or doubtful for each team and estimate how many points \
         the absences cost that team in this game (0 when fully healthy, at most {max}).\n\
         Respond with JSON of the form:\n\
         {{\"away_impact\": number, \"home_impact\": number, \
         \"away_out\": [string], \"home_out\": [string], \"summary\": string}}\n\
         away = {away}, home = {home}.",
        away = game.away_team,
        home = game.home_team,
        tip = game.commence_time.format("%Y-%m-%d %H:%M"),
        max = MAX_INJURY_IMPACT,
    )
}

/// Read an assessment out of the model's JSON. Impacts must be numbers
/// (numeric strings are accepted) and are clamped to `[0, MAX_INJURY_IMPACT]`.
pub fn parse_injury_report(value: &Value) -> Result<InjuryReport, ShivaError> {
    let impact = |field: &str| -> Result<f64, ShivaError> {
        let raw = match value.get(field) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(Value::Null) | None => Some(0.0),
            _ => None,
        };
        match raw {
            Some(v) if v.is_finite() => Ok(v.clamp(0.0, MAX_INJURY_IMPACT)),
            _ => Err(ShivaError::LlmResponse(format!("'{}' is not a number", field))),
        }
    };
    let players = |field: &str| -> Vec<String> {
        value
            .get(field)
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    };

    if !value.is_object() {
        return Err(ShivaError::LlmResponse("expected a JSON object".to_string()));
    }

    Ok(InjuryReport {
        away_impact: impact("away_impact")?,
        home_impact: impact("home_impact")?,
        away_out: players("away_out"),
        home_out: players("home_out"),
        summary: value
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string(),
    })
}

pub async fn fetch_injury_report(llm: &dyn TextCompletion, game: &Game) -> Result<InjuryReport> {
    let value = complete_json(llm, SYSTEM_PROMPT, &build_prompt(game)).await?;
    let report = parse_injury_report(&value)?;
    tracing::debug!(
        "Injury report via {}: away -{:.1}, home -{:.1}",
        llm.provider_name(),
        report.away_impact,
        report.home_impact
    );
    Ok(report)
}
