//! Assembly pipeline — the single entry point of the engine.
//!
//! Flow: normalize history dates → resolve experience units → merge/dedup →
//!       select under budget → attach sectors, profile extras, match summary.
//!
//! Pure: no I/O, no clock, no randomness. Data-quality problems end up in the
//! document's diagnostics, never as errors.

use std::collections::BTreeMap;

use tracing::debug;

use crate::assembly::dates::normalize_history;
use crate::assembly::dedup::{
    collapse_section, group_sectors, merge_experiences, Candidate, ResolvedUnit,
};
use crate::assembly::matcher::{resolve, ResolutionStrategy};
use crate::assembly::resume::{AssembledResume, MatchingSummary, ProfileExtras};
use crate::assembly::selector::select;
use crate::layout::LayoutBudget;
use crate::models::content::{ContentUnit, Section};
use crate::models::history::CareerHistory;

/// Assembles a résumé from scored units, the candidate's history and a budget.
pub fn assemble(
    units: &[ContentUnit],
    history: &CareerHistory,
    budget: &LayoutBudget,
) -> AssembledResume {
    let normalized = normalize_history(&history.experiences);

    let mut matching = MatchingSummary {
        demoted_current: normalized
            .iter()
            .filter(|exp| exp.current_demoted)
            .map(|exp| exp.record.label())
            .collect(),
        ..Default::default()
    };

    let mut experience_units: Vec<ResolvedUnit<'_>> = Vec::new();
    let mut other_units: BTreeMap<Section, Vec<(usize, &ContentUnit)>> = BTreeMap::new();

    for (order, unit) in units.iter().enumerate() {
        if unit.section != Section::Experiences {
            other_units
                .entry(unit.section)
                .or_default()
                .push((order, unit));
            continue;
        }

        let resolution = resolve(unit.source_ref.as_deref(), &normalized, Some(unit.text.as_str()));
        let strategy = resolution.strategy();
        *matching.by_strategy.entry(strategy).or_insert(0) += 1;
        if strategy == ResolutionStrategy::Unresolved {
            debug!(
                "Unit '{}' (source_ref {:?}) did not resolve to any experience",
                unit.id, unit.source_ref
            );
            matching.unmatched_unit_ids.push(unit.id.clone());
        }

        experience_units.push(ResolvedUnit {
            order,
            unit,
            strategy,
            history_index: resolution.index(),
        });
    }

    let mut candidates: BTreeMap<Section, Vec<Candidate>> = BTreeMap::new();
    candidates.insert(
        Section::Experiences,
        merge_experiences(&experience_units, &normalized),
    );
    for (section, section_units) in &other_units {
        candidates.insert(*section, collapse_section(section_units));
    }

    let selection = select(candidates, budget);
    debug!(
        "Selected {} entries ({} excluded), {}/{} units",
        selection.metrics.selected_entries,
        selection.metrics.excluded_entries,
        selection.metrics.consumed_units,
        selection.metrics.max_total_units
    );

    AssembledResume {
        sections: selection.sections,
        sector_groups: group_sectors(&history.reference_clients),
        profile: ProfileExtras {
            soft_skills: history.soft_skills.clone(),
            social_links: history.social_links.clone(),
            pitch: history.pitch.clone(),
        },
        metrics: selection.metrics,
        excluded: selection.excluded,
        matching,
    }
}
