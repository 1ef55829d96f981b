//! Relevance Selector / Budget Allocator — ranks and trims candidates to fit a layout.
//!
//! Algorithm:
//! 1. Sort each section by relevance, descending; ties keep generation order
//! 2. Walk sections in priority order (experiences > summary > skills > ...)
//! 3. Admit entries while the section cap and the global unit budget allow
//! 4. Experiences past the detailed limit, or that only fit condensed, lose bullets
//!
//! Pure and deterministic: the same candidates and budget give the same output.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::assembly::dedup::Candidate;
use crate::assembly::resume::{
    AssembledEntry, AssembledSection, EntryFormat, ExcludedEntry, ExclusionReason,
    UtilizationMetrics,
};
use crate::layout::LayoutBudget;
use crate::models::content::Section;

/// Result of selection, before profile and matching data are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub sections: Vec<AssembledSection>,
    pub excluded: Vec<ExcludedEntry>,
    pub metrics: UtilizationMetrics,
}

/// Selects entries for every section under `budget`.
pub fn select(
    mut candidates: BTreeMap<Section, Vec<Candidate>>,
    budget: &LayoutBudget,
) -> Selection {
    let mut consumed: u32 = 0;
    let mut detailed_used: usize = 0;
    let mut sections = Vec::with_capacity(Section::PRIORITY.len());
    let mut excluded = Vec::new();

    for section in Section::PRIORITY {
        let mut ranked = candidates.remove(&section).unwrap_or_default();
        ranked.sort_by(compare_candidates);

        let cap = budget.section_cap(section);
        let mut entries: Vec<AssembledEntry> = Vec::new();

        for candidate in ranked {
            if cap.is_some_and(|cap| entries.len() >= cap as usize) {
                excluded.push(exclusion(section, &candidate.entry, ExclusionReason::SectionCap));
                continue;
            }

            let remaining = budget.max_total_units.saturating_sub(consumed);
            match fit_entry(candidate, budget, remaining, detailed_used) {
                Ok((entry, cost)) => {
                    if entry
                        .experience
                        .as_ref()
                        .is_some_and(|e| e.format == EntryFormat::Detailed)
                    {
                        detailed_used += 1;
                    }
                    consumed += cost;
                    entries.push(entry);
                }
                Err(entry) => {
                    excluded.push(exclusion(section, &entry, ExclusionReason::GlobalBudget));
                }
            }
        }

        sections.push(AssembledSection { section, entries });
    }

    let metrics = compute_metrics(&sections, excluded.len(), consumed, budget);

    Selection {
        sections,
        excluded,
        metrics,
    }
}

/// Descending relevance, then ascending generation order.
fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.entry
        .relevance_score
        .total_cmp(&a.entry.relevance_score)
        .then(a.order.cmp(&b.order))
}

/// Shapes a candidate to the remaining budget.
///
/// Returns the admitted entry and its cost, or the untouched entry when even
/// the condensed form does not fit.
fn fit_entry(
    candidate: Candidate,
    budget: &LayoutBudget,
    remaining: u32,
    detailed_used: usize,
) -> Result<(AssembledEntry, u32), AssembledEntry> {
    let Candidate {
        unit_type,
        mut entry,
        ..
    } = candidate;

    let Some(mut detail) = entry.experience.take() else {
        let cost = budget.entry_cost(unit_type, 0);
        return if cost <= remaining {
            Ok((entry, cost))
        } else {
            Err(entry)
        };
    };

    detail
        .achievements
        .sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

    let available = detail.achievements.len();
    let detailed_keep = available.min(budget.max_achievements_per_experience);
    let condensed_keep = available.min(budget.condensed_achievements);

    let mut options = Vec::with_capacity(2);
    if detailed_used < budget.detailed_experience_limit {
        options.push((EntryFormat::Detailed, detailed_keep));
    }
    options.push((EntryFormat::Summary, condensed_keep));

    let chosen = options.into_iter().find_map(|(format, keep)| {
        let cost = budget.entry_cost(unit_type, keep);
        (cost <= remaining).then_some((format, keep, cost))
    });

    match chosen {
        Some((format, keep, cost)) => {
            detail.achievements.truncate(keep);
            detail.format = format;
            entry.experience = Some(detail);
            Ok((entry, cost))
        }
        None => {
            entry.experience = Some(detail);
            Err(entry)
        }
    }
}

fn exclusion(section: Section, entry: &AssembledEntry, reason: ExclusionReason) -> ExcludedEntry {
    ExcludedEntry {
        section,
        key: entry.key.clone(),
        relevance_score: entry.relevance_score,
        reason,
    }
}

fn compute_metrics(
    sections: &[AssembledSection],
    excluded_entries: usize,
    consumed: u32,
    budget: &LayoutBudget,
) -> UtilizationMetrics {
    let selected: Vec<&AssembledEntry> = sections.iter().flat_map(|s| s.entries.iter()).collect();

    let average_relevance = if selected.is_empty() {
        0.0
    } else {
        selected.iter().map(|e| e.relevance_score).sum::<f64>() / selected.len() as f64
    };

    let formats: Vec<EntryFormat> = selected
        .iter()
        .filter_map(|e| e.experience.as_ref().map(|d| d.format))
        .collect();

    let utilization = if budget.max_total_units == 0 {
        0.0
    } else {
        f64::from(consumed) / f64::from(budget.max_total_units)
    };

    UtilizationMetrics {
        consumed_units: consumed,
        max_total_units: budget.max_total_units,
        utilization,
        average_relevance,
        selected_entries: selected.len(),
        excluded_entries,
        detailed_entries: formats.iter().filter(|f| **f == EntryFormat::Detailed).count(),
        summary_entries: formats.iter().filter(|f| **f == EntryFormat::Summary).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::resume::{Achievement, ExperienceDetail};
    use crate::models::content::UnitType;

    fn text_candidate(key: &str, order: usize, score: f64, unit_type: UnitType) -> Candidate {
        Candidate {
            order,
            unit_type,
            entry: AssembledEntry {
                key: key.to_string(),
                unit_ids: vec![key.to_string()],
                text: key.to_string(),
                relevance_score: score,
                source_id: None,
                resolution: None,
                start_date: None,
                end_date: None,
                experience: None,
            },
        }
    }

    fn experience_candidate(key: &str, order: usize, scores: &[f64]) -> Candidate {
        let mut candidate = text_candidate(key, order, 0.0, UnitType::Header);
        candidate.entry.relevance_score = scores.iter().cloned().fold(0.0, f64::max);
        candidate.entry.experience = Some(ExperienceDetail {
            history_index: order,
            role: "Engineer".to_string(),
            employer: key.to_string(),
            is_current: false,
            achievements: scores
                .iter()
                .enumerate()
                .map(|(i, s)| Achievement {
                    unit_id: format!("{key}-{i}"),
                    text: format!("achievement {i}"),
                    relevance_score: *s,
                })
                .collect(),
            clients: vec![],
            format: EntryFormat::Detailed,
        });
        candidate
    }

    fn keys(selection: &Selection, section: Section) -> Vec<String> {
        selection
            .sections
            .iter()
            .find(|s| s.section == section)
            .map(|s| s.entries.iter().map(|e| e.key.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_sorted_by_relevance_with_stable_ties() {
        let mut input = BTreeMap::new();
        input.insert(
            Section::Skills,
            vec![
                text_candidate("b", 0, 50.0, UnitType::Skill),
                text_candidate("a", 1, 90.0, UnitType::Skill),
                text_candidate("c", 2, 50.0, UnitType::Skill),
            ],
        );
        let selection = select(input, &LayoutBudget::new(10));
        assert_eq!(keys(&selection, Section::Skills), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_section_cap_truncates() {
        let mut input = BTreeMap::new();
        input.insert(
            Section::Skills,
            (0..6)
                .map(|i| text_candidate(&format!("s{i}"), i, 10.0 * i as f64, UnitType::Skill))
                .collect(),
        );
        let budget = LayoutBudget::new(100).with_cap(Section::Skills, 4);
        let selection = select(input, &budget);

        assert_eq!(keys(&selection, Section::Skills), vec!["s5", "s4", "s3", "s2"]);
        assert_eq!(selection.excluded.len(), 2);
        assert!(selection
            .excluded
            .iter()
            .all(|e| e.reason == ExclusionReason::SectionCap));
    }

    #[test]
    fn test_global_budget_trims_lower_priority_sections_first() {
        let mut input = BTreeMap::new();
        input.insert(
            Section::Languages,
            vec![text_candidate("fr", 0, 99.0, UnitType::Language)],
        );
        input.insert(
            Section::Skills,
            vec![
                text_candidate("rust", 1, 40.0, UnitType::Skill),
                text_candidate("go", 2, 30.0, UnitType::Skill),
            ],
        );
        input.insert(
            Section::Experiences,
            vec![experience_candidate("acme", 3, &[20.0])],
        );

        let selection = select(input, &LayoutBudget::new(2));
        assert_eq!(keys(&selection, Section::Experiences), vec!["acme"]);
        assert_eq!(keys(&selection, Section::Skills), vec!["rust"]);
        assert!(keys(&selection, Section::Languages).is_empty());
        assert_eq!(selection.metrics.consumed_units, 2);
        assert!(selection
            .excluded
            .iter()
            .any(|e| e.key == "fr" && e.reason == ExclusionReason::GlobalBudget));
    }

    #[test]
    fn test_heavier_entry_skipped_lighter_admitted() {
        let mut input = BTreeMap::new();
        input.insert(
            Section::Projects,
            vec![
                text_candidate("big", 0, 90.0, UnitType::Project),
                text_candidate("small", 1, 10.0, UnitType::Other),
            ],
        );
        let budget = LayoutBudget::new(2).with_weight(UnitType::Project, 3);
        let selection = select(input, &budget);
        assert_eq!(keys(&selection, Section::Projects), vec!["small"]);
    }

    #[test]
    fn test_detailed_limit_condenses_later_experiences() {
        let mut input = BTreeMap::new();
        input.insert(
            Section::Experiences,
            vec![
                experience_candidate("one", 0, &[90.0, 80.0, 70.0]),
                experience_candidate("two", 1, &[60.0, 85.0]),
            ],
        );
        let budget = LayoutBudget {
            detailed_experience_limit: 1,
            condensed_achievements: 1,
            ..LayoutBudget::new(10)
        };
        let selection = select(input, &budget);
        let entries = &selection.sections[0].entries;

        let first = entries[0].experience.as_ref().unwrap();
        assert_eq!(first.format, EntryFormat::Detailed);
        assert_eq!(first.achievements.len(), 3);

        let second = entries[1].experience.as_ref().unwrap();
        assert_eq!(second.format, EntryFormat::Summary);
        assert_eq!(second.achievements.len(), 1);
        assert_eq!(second.achievements[0].relevance_score, 85.0, "best bullet kept");

        assert_eq!(selection.metrics.detailed_entries, 1);
        assert_eq!(selection.metrics.summary_entries, 1);
    }

    #[test]
    fn test_budget_pressure_condenses_before_excluding() {
        let mut input = BTreeMap::new();
        input.insert(
            Section::Experiences,
            vec![experience_candidate("acme", 0, &[90.0, 80.0, 70.0, 60.0])],
        );
        let budget = LayoutBudget {
            nested_achievement_weight: 1,
            ..LayoutBudget::new(3)
        };
        let selection = select(input, &budget);
        let detail = selection.sections[0].entries[0].experience.as_ref().unwrap();
        assert_eq!(detail.format, EntryFormat::Summary);
        assert_eq!(detail.achievements.len(), 1);
        assert_eq!(selection.metrics.consumed_units, 2);
    }

    #[test]
    fn test_budget_never_exceeded() {
        let mut input = BTreeMap::new();
        input.insert(
            Section::Experiences,
            (0..5)
                .map(|i| experience_candidate(&format!("e{i}"), i, &[50.0, 40.0, 30.0]))
                .collect(),
        );
        input.insert(
            Section::Skills,
            (0..20)
                .map(|i| text_candidate(&format!("s{i}"), i, 5.0, UnitType::Skill))
                .collect(),
        );
        let budget = LayoutBudget {
            nested_achievement_weight: 1,
            ..LayoutBudget::new(17)
                .with_cap(Section::Experiences, 3)
                .with_cap(Section::Skills, 5)
        };
        let selection = select(input, &budget);

        assert!(selection.metrics.consumed_units <= 17);
        assert!(keys(&selection, Section::Experiences).len() <= 3);
        assert!(keys(&selection, Section::Skills).len() <= 5);
    }

    #[test]
    fn test_zero_budget_selects_nothing() {
        let mut input = BTreeMap::new();
        input.insert(
            Section::Summary,
            vec![text_candidate("pitch", 0, 80.0, UnitType::Summary)],
        );
        let selection = select(input, &LayoutBudget::new(0));
        assert_eq!(selection.metrics.selected_entries, 0);
        assert_eq!(selection.metrics.utilization, 0.0);
        assert_eq!(selection.sections.len(), Section::PRIORITY.len());
    }

    #[test]
    fn test_metrics_average_relevance() {
        let mut input = BTreeMap::new();
        input.insert(
            Section::Skills,
            vec![
                text_candidate("a", 0, 80.0, UnitType::Skill),
                text_candidate("b", 1, 40.0, UnitType::Skill),
            ],
        );
        let selection = select(input, &LayoutBudget::new(4));
        assert!((selection.metrics.average_relevance - 60.0).abs() < f64::EPSILON);
        assert!((selection.metrics.utilization - 0.5).abs() < f64::EPSILON);
    }
}
