//! History Matcher — resolves a unit's source reference to a history entry.
//!
//! Identifiers minted by the generation step drift between calls, so resolution
//! walks an ordered fallback chain and stops at the first hit:
//!
//! 1. positional token (`exp_2`, `item:2`, ...) within bounds
//! 2. literal persisted id
//! 3. fuzzy text match on role/employer (only when fallback text is supplied)
//! 4. unresolved
//!
//! Positional and id matches must always outrank a text coincidence.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::assembly::dates::NormalizedExperience;
use crate::assembly::text::{fold, prefix_chars};
use crate::models::history::ExperienceRecord;

/// Leading characters of the folded employer that must appear in the text.
const EMPLOYER_PREFIX_CHARS: usize = 20;
/// Leading characters of the folded role that must appear in the text.
const ROLE_PREFIX_CHARS: usize = 30;
/// Role-only matches are accepted only for roles longer than this.
const ROLE_ONLY_MIN_CHARS: usize = 10;

/// Anything the matcher can resolve against.
pub trait MatchTarget {
    fn persisted_id(&self) -> Option<&str>;
    fn role(&self) -> &str;
    fn employer(&self) -> &str;
}

impl MatchTarget for ExperienceRecord {
    fn persisted_id(&self) -> Option<&str> {
        ExperienceRecord::persisted_id(self)
    }

    fn role(&self) -> &str {
        &self.role
    }

    fn employer(&self) -> &str {
        &self.employer
    }
}

impl MatchTarget for NormalizedExperience {
    fn persisted_id(&self) -> Option<&str> {
        self.record.persisted_id()
    }

    fn role(&self) -> &str {
        &self.record.role
    }

    fn employer(&self) -> &str {
        &self.record.employer
    }
}

/// Which fuzzy rule produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuzzyKind {
    /// Employer prefix and role prefix both found in the text.
    Combined,
    /// Only a long role prefix was found.
    RoleOnly,
}

/// Outcome of one resolution, tagged with the strategy that fired.
#[derive(Debug)]
pub enum Resolution<'a, T> {
    Positional { index: usize, entry: &'a T },
    ExactId { index: usize, entry: &'a T },
    Fuzzy { index: usize, entry: &'a T, kind: FuzzyKind },
    Unresolved,
}

/// Serializable tag of a [`Resolution`], carried on assembled entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    Positional,
    ExactId,
    FuzzyCombined,
    FuzzyRoleOnly,
    Unresolved,
}

impl<'a, T> Resolution<'a, T> {
    pub fn entry(&self) -> Option<&'a T> {
        match self {
            Resolution::Positional { entry, .. }
            | Resolution::ExactId { entry, .. }
            | Resolution::Fuzzy { entry, .. } => Some(*entry),
            Resolution::Unresolved => None,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Resolution::Positional { index, .. }
            | Resolution::ExactId { index, .. }
            | Resolution::Fuzzy { index, .. } => Some(*index),
            Resolution::Unresolved => None,
        }
    }

    pub fn strategy(&self) -> ResolutionStrategy {
        match self {
            Resolution::Positional { .. } => ResolutionStrategy::Positional,
            Resolution::ExactId { .. } => ResolutionStrategy::ExactId,
            Resolution::Fuzzy {
                kind: FuzzyKind::Combined,
                ..
            } => ResolutionStrategy::FuzzyCombined,
            Resolution::Fuzzy {
                kind: FuzzyKind::RoleOnly,
                ..
            } => ResolutionStrategy::FuzzyRoleOnly,
            Resolution::Unresolved => ResolutionStrategy::Unresolved,
        }
    }
}

fn positional_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:exp|experience|item|idx|index|pos)[\s_\-:#]?(\d+)$")
            .expect("positional token regex must compile")
    })
}

/// Parses a "nth generated item" token into its 0-based index.
pub fn positional_index(source_ref: &str) -> Option<usize> {
    positional_re()
        .captures(source_ref.trim())
        .and_then(|caps| caps[1].parse().ok())
}

/// Resolves a source reference through the fallback chain. Never fails.
pub fn resolve<'a, T: MatchTarget>(
    source_ref: Option<&str>,
    history: &'a [T],
    fallback_text: Option<&str>,
) -> Resolution<'a, T> {
    if let Some(source_ref) = source_ref.map(str::trim).filter(|s| !s.is_empty()) {
        if let Some(index) = positional_index(source_ref) {
            if let Some(entry) = history.get(index) {
                return Resolution::Positional { index, entry };
            }
        }

        if let Some((index, entry)) = history
            .iter()
            .enumerate()
            .find(|(_, entry)| entry.persisted_id() == Some(source_ref))
        {
            return Resolution::ExactId { index, entry };
        }
    }

    match fallback_text {
        Some(text) if !text.trim().is_empty() => fuzzy_match(text, history),
        _ => Resolution::Unresolved,
    }
}

/// Convenience wrapper returning only the matched entry.
pub fn resolve_entry<'a, T: MatchTarget>(
    source_ref: Option<&str>,
    history: &'a [T],
    fallback_text: Option<&str>,
) -> Option<&'a T> {
    resolve(source_ref, history, fallback_text).entry()
}

fn fuzzy_match<'a, T: MatchTarget>(text: &str, history: &'a [T]) -> Resolution<'a, T> {
    let folded_text = fold(text);
    let keys: Vec<(String, String)> = history
        .iter()
        .map(|entry| (fold(entry.role()), fold(entry.employer())))
        .collect();

    let combined = keys.iter().position(|(role, employer)| {
        !role.is_empty()
            && !employer.is_empty()
            && folded_text.contains(prefix_chars(employer, EMPLOYER_PREFIX_CHARS))
            && folded_text.contains(prefix_chars(role, ROLE_PREFIX_CHARS))
    });
    if let Some(index) = combined {
        return Resolution::Fuzzy {
            index,
            entry: &history[index],
            kind: FuzzyKind::Combined,
        };
    }

    let role_only = keys.iter().position(|(role, _)| {
        role.chars().count() > ROLE_ONLY_MIN_CHARS
            && folded_text.contains(prefix_chars(role, ROLE_PREFIX_CHARS))
    });
    match role_only {
        Some(index) => Resolution::Fuzzy {
            index,
            entry: &history[index],
            kind: FuzzyKind::RoleOnly,
        },
        None => Resolution::Unresolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp(id: Option<&str>, role: &str, employer: &str) -> ExperienceRecord {
        ExperienceRecord {
            id: id.map(str::to_string),
            role: role.to_string(),
            employer: employer.to_string(),
            ..Default::default()
        }
    }

    fn sample_history() -> Vec<ExperienceRecord> {
        vec![
            exp(Some("db-101"), "Développeur Backend", "Société Générale"),
            exp(Some("db-102"), "Lead Data Engineer", "BNP Paribas"),
            exp(None, "Consultant Cybersécurité Senior", "Capgemini"),
        ]
    }

    #[test]
    fn test_positional_tokens() {
        assert_eq!(positional_index("exp_2"), Some(2));
        assert_eq!(positional_index("EXPERIENCE-0"), Some(0));
        assert_eq!(positional_index("item:11"), Some(11));
        assert_eq!(positional_index("idx3"), Some(3));
        assert_eq!(positional_index("pos#1"), Some(1));
        assert_eq!(positional_index("db-101"), None);
        assert_eq!(positional_index("42"), None);
    }

    #[test]
    fn test_positional_match() {
        let history = sample_history();
        let res = resolve(Some("exp_1"), &history, None);
        assert_eq!(res.strategy(), ResolutionStrategy::Positional);
        assert_eq!(res.entry().unwrap().employer, "BNP Paribas");
    }

    #[test]
    fn test_positional_out_of_bounds_falls_through() {
        let history = sample_history();
        let res = resolve(Some("exp_9"), &history, None);
        assert_eq!(res.strategy(), ResolutionStrategy::Unresolved);
    }

    #[test]
    fn test_exact_id_match() {
        let history = sample_history();
        let res = resolve(Some("db-102"), &history, None);
        assert_eq!(res.strategy(), ResolutionStrategy::ExactId);
        assert_eq!(res.index(), Some(1));
    }

    #[test]
    fn test_positional_beats_fuzzy() {
        let history = sample_history();
        // Text names the first entry, the token points at the second.
        let res = resolve(
            Some("exp_1"),
            &history,
            Some("Développeur Backend chez Société Générale"),
        );
        assert_eq!(res.strategy(), ResolutionStrategy::Positional);
        assert_eq!(res.index(), Some(1));
    }

    #[test]
    fn test_exact_id_beats_fuzzy() {
        let history = sample_history();
        let res = resolve(
            Some("db-102"),
            &history,
            Some("Développeur Backend chez Société Générale"),
        );
        assert_eq!(res.strategy(), ResolutionStrategy::ExactId);
        assert_eq!(res.index(), Some(1));
    }

    #[test]
    fn test_fuzzy_combined_ignores_case_and_accents() {
        let history = sample_history();
        let res = resolve(
            Some("stale-id-9f3"),
            &history,
            Some("DEVELOPPEUR BACKEND - societe generale (Paris)"),
        );
        assert_eq!(res.strategy(), ResolutionStrategy::FuzzyCombined);
        assert_eq!(res.index(), Some(0));
    }

    #[test]
    fn test_fuzzy_role_only_requires_long_role() {
        let history = sample_history();
        let res = resolve(None, &history, Some("Consultant cybersecurite senior, missions audit"));
        assert_eq!(res.strategy(), ResolutionStrategy::FuzzyRoleOnly);
        assert_eq!(res.index(), Some(2));

        let short = vec![exp(None, "Dev", "Acme")];
        let res = resolve(None, &short, Some("Dev at somewhere else"));
        assert_eq!(res.strategy(), ResolutionStrategy::Unresolved);
    }

    #[test]
    fn test_combined_preferred_over_earlier_role_only() {
        let history = vec![
            exp(None, "Senior Software Engineer", "Globex"),
            exp(None, "Senior Software Engineer", "Initech"),
        ];
        let res = resolve(None, &history, Some("Senior Software Engineer at Initech"));
        assert_eq!(res.strategy(), ResolutionStrategy::FuzzyCombined);
        assert_eq!(res.index(), Some(1));
    }

    #[test]
    fn test_long_names_match_on_prefix() {
        let history = vec![exp(
            None,
            "Responsable de la transformation numérique et des données",
            "Compagnie Générale des Établissements Michelin",
        )];
        let text = "responsable de la transformation numer... compagnie generale des e...";
        let res = resolve(None, &history, Some(text));
        assert_eq!(res.strategy(), ResolutionStrategy::FuzzyCombined);
    }

    #[test]
    fn test_no_fallback_text_means_unresolved() {
        let history = sample_history();
        assert!(resolve_entry(Some("unknown"), &history, None).is_none());
        assert!(resolve_entry(None, &history, Some("   ")).is_none());
    }

    #[test]
    fn test_empty_history_never_panics() {
        let history: Vec<ExperienceRecord> = vec![];
        let res = resolve(Some("exp_0"), &history, Some("anything"));
        assert_eq!(res.strategy(), ResolutionStrategy::Unresolved);
    }
}
