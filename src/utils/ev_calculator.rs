/// Standard deviation of an NBA final margin around its projection
pub const NBA_MARGIN_STD_DEV: f64 = 12.0;
/// Standard deviation of an NBA game total around its projection
pub const NBA_TOTAL_STD_DEV: f64 = 18.0;

/// Convert American odds to implied probability
/// Positive odds (+150) mean you win $150 on a $100 bet
/// Negative odds (-150) mean you need to bet $150 to win $100
pub fn american_odds_to_probability(odds: i32) -> f64 {
    if odds > 0 {
        // For positive odds: 100 / (odds + 100)
        100.0 / (odds as f64 + 100.0)
    } else {
        // For negative odds: |odds| / (|odds| + 100)
        let abs_odds = odds.abs() as f64;
        abs_odds / (abs_odds + 100.0)
    }
}

/// Units won per unit staked when the bet wins
pub fn win_multiplier(odds: i32) -> f64 {
    if odds > 0 {
        odds as f64 / 100.0
    } else {
        100.0 / odds.abs() as f64
    }
}

/// Calculate expected value for a bet
/// EV = (probability of winning * amount won per bet) - (probability of losing * amount lost per bet)
/// Returns EV as a fraction of the bet amount
pub fn calculate_expected_value(model_prob: f64, odds: i32) -> f64 {
    let lose_amount = 1.0; // You lose your bet amount
    let prob_lose = 1.0 - model_prob;

    (model_prob * win_multiplier(odds)) - (prob_lose * lose_amount)
}

/// P(X > threshold) where X ~ Normal(mean, std_dev)
pub fn probability_above(mean: f64, threshold: f64, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return if mean > threshold { 1.0 } else { 0.0 };
    }
    1.0 - normal_cdf((threshold - mean) / std_dev)
}

/// Calculate the probability of covering a spread
///
/// model_margin: predicted point differential from the bet team's perspective
/// bet_spread: the team's line (e.g., -7.5 means it must win by more than 7.5)
///
/// The team covers when actual_margin + bet_spread > 0, with
/// actual_margin ~ Normal(model_margin, std_dev)
pub fn calculate_spread_cover_probability(model_margin: f64, bet_spread: f64, std_dev: f64) -> f64 {
    probability_above(model_margin, -bet_spread, std_dev)
}

/// Approximation of the standard normal cumulative distribution function
/// Using the error function approximation
fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Approximation of the error function using Abramowitz and Stegun formula
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_american_odds_to_probability() {
        // Positive odds
        let prob = american_odds_to_probability(150);
        assert!((prob - 0.4).abs() < 0.01);
        // Negative odds
        let prob = american_odds_to_probability(-150);
        assert!((prob - 0.6).abs() < 0.01);
        // Standard juice
        let prob = american_odds_to_probability(-110);
        assert!((prob - 0.5238).abs() < 0.001);
    }

    #[test]
    fn test_win_multiplier() {
        assert!((win_multiplier(-110) - 100.0 / 110.0).abs() < 1e-12);
        assert!((win_multiplier(150) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_calculate_expected_value() {
        // Break-even at -110 is 52.38%
        assert!(calculate_expected_value(0.55, -110) > 0.0);
        assert!(calculate_expected_value(0.50, -110) < 0.0);
        assert!(calculate_expected_value(0.4, -150) < 0.0);
    }

    #[test]
    fn test_probability_above() {
        assert!((probability_above(225.0, 225.0, NBA_TOTAL_STD_DEV) - 0.5).abs() < 1e-6);
        assert!(probability_above(231.0, 225.0, NBA_TOTAL_STD_DEV) > 0.6);
        assert!(probability_above(219.0, 225.0, NBA_TOTAL_STD_DEV) < 0.4);
        assert_eq!(probability_above(226.0, 225.0, 0.0), 1.0);
    }

    #[test]
    fn test_calculate_spread_cover_probability() {
        // Projected to win by 10 laying 7: likely cover
        assert!(calculate_spread_cover_probability(10.0, -7.0, NBA_MARGIN_STD_DEV) > 0.5);
        // Projected to win by 3 laying 7: unlikely
        assert!(calculate_spread_cover_probability(3.0, -7.0, NBA_MARGIN_STD_DEV) < 0.5);
        // Projected to lose by 5 getting 5: coin flip
        let prob = calculate_spread_cover_probability(-5.0, 5.0, NBA_MARGIN_STD_DEV);
        assert!((prob - 0.5).abs() < 1e-6);
        // Projected to win by 5 getting 5: very likely
        assert!(calculate_spread_cover_probability(5.0, 5.0, NBA_MARGIN_STD_DEV) > 0.7);
    }
}
