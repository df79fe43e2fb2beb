use crate::models::teams::team_abbreviation;
use crate::models::{Pick, PickStatus, Side};
use crate::utils::ev_calculator::win_multiplier;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A finished game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalScore {
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
}

impl FinalScore {
    /// Same matchup, played within a day of the pick's start time (UTC vs
    /// US-local dates differ for evening tip-offs)
    pub fn matches(&self, pick: &Pick) -> bool {
        let same_team = |a: &str, b: &str| match (team_abbreviation(a), team_abbreviation(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a.eq_ignore_ascii_case(b),
        };
        let days_apart = (pick.commence_time.date_naive() - self.date).num_days().abs();

        days_apart <= 1
            && same_team(&self.home_team, &pick.home_team)
            && same_team(&self.away_team, &pick.away_team)
    }
}

/// Grade a pick against a final score: status and profit in units
pub fn grade_pick(pick: &Pick, score: &FinalScore) -> (PickStatus, f64) {
    let home = score.home_score as f64;
    let away = score.away_score as f64;

    let margin_vs_line = match pick.selection {
        Side::Over => home + away - pick.line,
        Side::Under => pick.line - (home + away),
        Side::Home => home - away + pick.line,
        Side::Away => away - home + pick.line,
    };

    let units = pick.units as f64;
    if margin_vs_line > 0.0 {
        (PickStatus::Won, units * win_multiplier(pick.odds))
    } else if margin_vs_line < 0.0 {
        (PickStatus::Lost, -units)
    } else {
        (PickStatus::Push, 0.0)
    }
}

/// Grade every pending pick with a matching final score.
/// Returns how many picks changed.
pub fn grade_picks(picks: &mut [Pick], scores: &[FinalScore]) -> usize {
    let mut graded = 0;
    for pick in picks.iter_mut().filter(|p| p.status == PickStatus::Pending) {
        if let Some(score) = scores.iter().find(|s| s.matches(pick)) {
            let (status, profit) = grade_pick(pick, score);
            tracing::info!(
                "Graded {} {}: {:?} ({:+.2}u)",
                pick.capper_id,
                pick.selection_label(),
                status,
                profit
            );
            pick.status = status;
            pick.profit_units = Some(profit);
            graded += 1;
        }
    }
    graded
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecordSummary {
    pub wins: usize,
    pub losses: usize,
    pub pushes: usize,
    pub pending: usize,
    pub net_units: f64,
}

impl RecordSummary {
    pub fn format(&self) -> String {
        format!(
            "{}-{}-{} ({} pending) | Net: {:+.2}u",
            self.wins, self.losses, self.pushes, self.pending, self.net_units
        )
    }
}

pub fn record_summary(picks: &[Pick]) -> RecordSummary {
    picks.iter().fold(RecordSummary::default(), |mut summary, pick| {
        match pick.status {
            PickStatus::Won => summary.wins += 1,
            PickStatus::Lost => summary.losses += 1,
            PickStatus::Push => summary.pushes += 1,
            PickStatus::Pending => summary.pending += 1,
        }
        summary.net_units += pick.profit_units.unwrap_or(0.0);
        summary
    })
}
