//! Table and column naming rules, and competence (`AAAAMM`) detection

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// MySQL identifier length limit
const MAX_IDENTIFIER_LENGTH: usize = 64;

static COMPETENCE_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"20\d{2}[01]\d").expect("valid competence pattern"),
        Regex::new(r"\d{6}").expect("valid competence pattern"),
    ]
});

static COMPETENCE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)_(\d{6})$").expect("valid competence suffix pattern"));

/// Lowercase, turn runs of characters outside `[a-z0-9_]` into `_`, collapse
/// repeated `_`, trim `_` from both ends and cut at 64 characters
///
/// `"TB_Procedimento (2024)"` becomes `"tb_procedimento_2024"`.
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    for character in name.to_lowercase().chars() {
        let keep = character.is_ascii_lowercase() || character.is_ascii_digit();
        let next = if keep { character } else { '_' };
        if next == '_' && normalized.ends_with('_') {
            continue;
        }
        normalized.push(next);
    }

    normalized
        .trim_matches('_')
        .chars()
        .take(MAX_IDENTIFIER_LENGTH)
        .collect()
}

fn valid_month(competence: &str) -> bool {
    competence
        .get(4..6)
        .and_then(|month| month.parse::<u32>().ok())
        .is_some_and(|month| (1..=12).contains(&month))
}

/// Find a competence (`AAAAMM`, month 01-12) anywhere in a path
///
/// Years starting with `20` are preferred; any six digits are the fallback.
pub fn detect_competence(path: &Path) -> Option<String> {
    let text = path.to_string_lossy();
    COMPETENCE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .find(&text)
            .map(|found| found.as_str())
            .filter(|competence| valid_month(competence))
            .map(str::to_string)
    })
}

/// Drop a trailing `_AAAAMM` from a file stem
pub fn strip_competence_suffix(stem: &str) -> &str {
    match COMPETENCE_SUFFIX.captures(stem) {
        Some(captures) if valid_month(&captures[2]) => {
            captures.get(1).map_or(stem, |base| base.as_str())
        }
        _ => stem,
    }
}
