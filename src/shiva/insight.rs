use super::confidence::FactorContribution;
use crate::api::llm::TextCompletion;
use crate::models::Pick;
use anyhow::Result;

const SYSTEM_PROMPT: &str = "You are SHIVA, a sharp NBA handicapper. Write a concise betting \
analysis in plain prose: two or three short paragraphs, no bullet lists, no disclaimers.";

/// Insights longer than this are cut at a word boundary
const MAX_INSIGHT_CHARS: usize = 1200;

pub fn build_prompt(pick: &Pick, factors: &[FactorContribution]) -> String {
    let mut prompt = format!(
        "Pick: {} @ {} | {} ({:+}) | {}u\n\
         Confidence {:.1}/10, model {:.1} vs market {:.1} (edge {:+.1}), win probability {:.1}%\n\n\
         Factors (signal, weight, points):\n",
        pick.away_team,
        pick.home_team,
        pick.selection_label(),
        pick.odds,
        pick.units,
        pick.confidence,
        pick.predicted_value,
        pick.market_value,
        pick.edge,
        pick.model_prob * 100.0,
    );

    for c in factors {
        prompt.push_str(&format!(
            "- {}: {:+.2}, {:.0}%, {:.2}",
            c.signal.name, c.signal.signal, c.weight, c.points
        ));
        if let Some(note) = &c.signal.note {
            prompt.push_str(&format!(" ({})", note));
        }
        prompt.push('\n');
    }
    prompt.push_str("\nExplain why this side is the play, leaning on the strongest factors.");
    prompt
}

fn truncate(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= MAX_INSIGHT_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_INSIGHT_CHARS).collect();
    match cut.rfind(char::is_whitespace) {
        Some(i) => format!("{}...", cut[..i].trim_end()),
        None => cut,
    }
}

pub async fn generate_insight(
    llm: &dyn TextCompletion,
    pick: &Pick,
    factors: &[FactorContribution],
) -> Result<String> {
    let text = llm.complete(SYSTEM_PROMPT, &build_prompt(pick, factors)).await?;
    Ok(truncate(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::FactorSignal;
    use crate::models::{BetType, PickStatus, Side, Sport};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    struct Echo;

    #[async_trait]
    impl TextCompletion for Echo {
        fn provider_name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, _system: &str, user: &str) -> Result<String> {
            Ok(format!("  {}  ", user))
        }
    }

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
            commence_time: Utc::now(),
            selection: Side::Over,
            line: 224.5,
            odds: -110,
            units: 3,
            confidence: 7.4,
            predicted_value: 231.0,
            market_value: 224.5,
            edge: 6.5,
            model_prob: 0.64,
            expected_value: 0.22,
            insight: None,
            status: PickStatus::Pending,
            profit_units: None,
            created_at: Utc::now(),
        }
    }

    fn contribution(name: &str, signal: f64, note: Option<&str>) -> FactorContribution {
        FactorContribution::new(
            FactorSignal {
                key: name.to_lowercase(),
                name: name.to_string(),
                signal,
                inputs: BTreeMap::new(),
                note: note.map(str::to_string),
            },
            50.0,
        )
    }

    #[test]
    fn test_prompt_lists_factors() {
        let prompt = build_prompt(
            &pick(),
            &[
                contribution("Pace Index", 0.6, None),
                contribution("Injury Availability", 0.0, Some("no injury data")),
            ],
        );
        assert!(prompt.contains("OVER 224.5 (-110) | 3u"));
        assert!(prompt.contains("- Pace Index: +0.60, 50%, 1.50"));
        assert!(prompt.contains("(no injury data)"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("  short  "), "short");
        let long = "word ".repeat(400);
        let cut = truncate(&long);
        assert!(cut.ends_with("word..."));
        assert!(cut.chars().count() <= MAX_INSIGHT_CHARS + 3);
    }

    #[tokio::test]
    async fn test_generate_insight_trims() {
        let text = generate_insight(&Echo, &pick(), &[]).await.unwrap();
        assert!(text.starts_with("Pick: New York Knicks @ Boston Celtics"));
        assert!(!text.ends_with(' '));
    }
}
