//! Content moderation for topics and generated category labels
//!
//! Plain case-insensitive substring matching against fixed denylists:
//! - `PROHIBITED_TERMS` applies to every request
//! - `YOUTH_THEMES` applies on top of it for youth editions

/// Terms never allowed in a topic or a generated category
pub const PROHIBITED_TERMS: &[&str] = &[
    "violence",
    "weapons",
    "drugs",
    "alcohol",
    "gambling",
    "tobacco",
    "explicit",
    "adult",
    "mature",
    "inappropriate",
    "offensive",
    "hate",
    "discrimination",
    "racism",
    "sexism",
    "harassment",
    "suicide",
    "self-harm",
    "gore",
    "torture",
    "murder",
    "kill",
    "porn",
    "sexual",
    "nude",
    "nudity",
    "erotic",
    "xxx",
];

/// Themes that are fine for adults but not for youth editions
pub const YOUTH_THEMES: &[&str] = &[
    "dating",
    "romance",
    "relationship",
    "marriage",
    "adult",
    "mature",
];

/// Why a piece of text was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    Prohibited,
    AdultThemeForYouth,
}

impl Violation {
    pub fn message(&self) -> &'static str {
        match self {
            Violation::Prohibited => "Topic contains inappropriate content",
            Violation::AdultThemeForYouth => "Topic is not suitable for youth editions",
        }
    }
}

fn contains_any(text: &str, terms: &[&str]) -> bool {
    let lower = text.to_lowercase();
    terms.iter().any(|term| lower.contains(term))
}

/// Check text against the base denylist
pub fn is_prohibited(text: &str) -> bool {
    contains_any(text, PROHIBITED_TERMS)
}

/// Check text against the youth theme list
pub fn is_adult_theme_for_youth(text: &str) -> bool {
    contains_any(text, YOUTH_THEMES)
}

/// Run both checks as appropriate for the audience.
/// The base list is checked first so its violation wins.
pub fn check(text: &str, is_youth: bool) -> Result<(), Violation> {
    if is_prohibited(text) {
        return Err(Violation::Prohibited);
    }
    if is_youth && is_adult_theme_for_youth(text) {
        return Err(Violation::AdultThemeForYouth);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prohibited_any_case() {
        assert!(is_prohibited("Violence in movies"));
        assert!(is_prohibited("famous MURDER mysteries"));
        assert!(is_prohibited("Self-Harm awareness"));
        assert!(is_prohibited("xXx"));

        assert!(!is_prohibited("rivers"));
        assert!(!is_prohibited("Famous painters"));
        assert!(!is_prohibited(""));
    }

    #[test]
    fn test_substring_matching_is_literal() {
        // Substring match, so words containing a term are caught too
        assert!(is_prohibited("Skills for chess"));
        assert!(is_prohibited("whatever"));
        assert!(!is_prohibited("self harm"));
    }

    #[test]
    fn test_youth_themes() {
        assert!(is_adult_theme_for_youth("Famous Romance novels"));
        assert!(is_adult_theme_for_youth("DATING apps"));
        assert!(!is_adult_theme_for_youth("Dinosaurs"));
    }

    #[test]
    fn test_check_respects_audience() {
        assert_eq!(check("Royal marriages", false), Ok(()));
        assert_eq!(
            check("Royal marriages", true),
            Err(Violation::AdultThemeForYouth)
        );

        // "adult" is on both lists; the base list wins
        assert_eq!(check("adult films", true), Err(Violation::Prohibited));
        assert_eq!(check("adult films", false), Err(Violation::Prohibited));

        assert_eq!(check("Planets", true), Ok(()));
    }
}
