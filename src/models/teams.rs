/// (full name, abbreviation)
const NBA_TEAMS: [(&str, &str); 30] = [
    ("Atlanta Hawks", "ATL"),
    ("Boston Celtics", "BOS"),
    ("Brooklyn Nets", "BKN"),
    ("Charlotte Hornets", "CHA"),
    ("Chicago Bulls", "CHI"),
    ("Cleveland Cavaliers", "CLE"),
    ("Dallas Mavericks", "DAL"),
    ("Denver Nuggets", "DEN"),
    ("Detroit Pistons", "DET"),
    ("Golden State Warriors", "GSW"),
    ("Houston Rockets", "HOU"),
    ("Indiana Pacers", "IND"),
    ("Los Angeles Clippers", "LAC"),
    ("Los Angeles Lakers", "LAL"),
    ("Memphis Grizzlies", "MEM"),
    ("Miami Heat", "MIA"),
    ("Milwaukee Bucks", "MIL"),
    ("Minnesota Timberwolves", "MIN"),
    ("New Orleans Pelicans", "NOP"),
    ("New York Knicks", "NYK"),
    ("Oklahoma City Thunder", "OKC"),
    ("Orlando Magic", "ORL"),
    ("Philadelphia 76ers", "PHI"),
    ("Phoenix Suns", "PHX"),
    ("Portland Trail Blazers", "POR"),
    ("Sacramento Kings", "SAC"),
    ("San Antonio Spurs", "SAS"),
    ("Toronto Raptors", "TOR"),
    ("Utah Jazz", "UTA"),
    ("Washington Wizards", "WAS"),
];

/// Alternate spellings seen across odds and stats feeds
const ALIASES: [(&str, &str); 8] = [
    ("la clippers", "LAC"),
    ("la lakers", "LAL"),
    ("philadelphia sixers", "PHI"),
    ("portland trailblazers", "POR"),
    ("bro", "BKN"),
    ("okl", "OKC"),
    ("pho", "PHX"),
    ("gs", "GSW"),
];

/// Lowercase, collapse whitespace and drop punctuation
pub fn normalize_team_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Resolve a full name, nickname, abbreviation or known alias to the
/// standard three-letter abbreviation.
/// "Boston Celtics" -> "BOS", "celtics" -> "BOS", "BRO" -> "BKN"
pub fn team_abbreviation(name: &str) -> Option<&'static str> {
    let normalized = normalize_team_name(name);
    if normalized.is_empty() {
        return None;
    }

    for (full, abbr) in NBA_TEAMS {
        if normalize_team_name(full) == normalized || abbr.eq_ignore_ascii_case(&normalized) {
            return Some(abbr);
        }
    }

    if let Some((_, abbr)) = ALIASES.iter().find(|(alias, _)| *alias == normalized) {
        return Some(*abbr);
    }

    // Nickname only, e.g. "Trail Blazers" or "76ers"
    NBA_TEAMS
        .iter()
        .find(|(full, _)| normalize_team_name(full).ends_with(&format!(" {}", normalized)))
        .map(|(_, abbr)| *abbr)
}

/// Full team name for a standard abbreviation
pub fn team_name(abbr: &str) -> Option<&'static str> {
    NBA_TEAMS
        .iter()
        .find(|(_, a)| a.eq_ignore_ascii_case(abbr))
        .map(|(full, _)| *full)
}
