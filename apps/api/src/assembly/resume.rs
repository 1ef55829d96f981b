//! Output document of an assembly run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::assembly::dates::DateValue;
use crate::assembly::matcher::ResolutionStrategy;
use crate::models::content::Section;

/// The assembled résumé: every section in priority order, possibly empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledResume {
    pub sections: Vec<AssembledSection>,
    pub sector_groups: Vec<SectorGroup>,
    pub profile: ProfileExtras,
    pub metrics: UtilizationMetrics,
    pub excluded: Vec<ExcludedEntry>,
    pub matching: MatchingSummary,
}

impl AssembledResume {
    pub fn section(&self, section: Section) -> &[AssembledEntry] {
        self.sections
            .iter()
            .find(|s| s.section == section)
            .map(|s| s.entries.as_slice())
            .unwrap_or(&[])
    }

    pub fn experiences(&self) -> impl Iterator<Item = &ExperienceDetail> {
        self.section(Section::Experiences)
            .iter()
            .filter_map(|entry| entry.experience.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledSection {
    pub section: Section,
    pub entries: Vec<AssembledEntry>,
}

/// One selected entry. Experience entries carry the merged history data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledEntry {
    /// Stable grouping key: persisted history id, `history#<n>`, or the unit id.
    pub key: String,
    pub unit_ids: Vec<String>,
    pub text: String,
    pub relevance_score: f64,
    /// Persisted id of the originating history entry, when resolved to one.
    pub source_id: Option<String>,
    pub resolution: Option<ResolutionStrategy>,
    pub start_date: Option<DateValue>,
    pub end_date: Option<DateValue>,
    pub experience: Option<ExperienceDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceDetail {
    /// Index into the caller's experience list.
    pub history_index: usize,
    pub role: String,
    pub employer: String,
    pub is_current: bool,
    pub achievements: Vec<Achievement>,
    pub clients: Vec<String>,
    pub format: EntryFormat,
}

impl ExperienceDetail {
    pub fn label(&self) -> String {
        crate::models::history::experience_label(&self.role, &self.employer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub unit_id: String,
    pub text: String,
    pub relevance_score: f64,
}

/// How much of an experience the layout shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryFormat {
    Detailed,
    Summary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorGroup {
    pub sector: String,
    pub clients: Vec<String>,
}

/// History fields that are not budgeted but travel with the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileExtras {
    pub soft_skills: Vec<String>,
    pub social_links: Vec<String>,
    pub pitch: Option<String>,
}

/// Diagnostic budget figures. Never used to gate output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationMetrics {
    pub consumed_units: u32,
    pub max_total_units: u32,
    pub utilization: f64,
    pub average_relevance: f64,
    pub selected_entries: usize,
    pub excluded_entries: usize,
    pub detailed_entries: usize,
    pub summary_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedEntry {
    pub section: Section,
    pub key: String,
    pub relevance_score: f64,
    pub reason: ExclusionReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    SectionCap,
    GlobalBudget,
}

/// How the experience-section units were resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingSummary {
    pub by_strategy: BTreeMap<ResolutionStrategy, usize>,
    pub unmatched_unit_ids: Vec<String>,
    pub demoted_current: Vec<String>,
}
