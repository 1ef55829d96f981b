//! Layout budget — how much content a template can hold for one run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::content::{Section, UnitType};

/// Global and per-section unit budget, immutable for an assembly run.
///
/// An entry costs `type_weights[type]` (default 1). Experience entries also pay
/// `nested_achievement_weight` per achievement they keep, which is 0 unless a
/// template opts in, so by default one selected entry costs one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutBudget {
    pub max_total_units: u32,
    /// Sections without a cap are bounded only by `max_total_units`.
    #[serde(default)]
    pub per_section_caps: BTreeMap<Section, u32>,
    #[serde(default)]
    pub type_weights: BTreeMap<UnitType, u32>,
    #[serde(default)]
    pub nested_achievement_weight: u32,
    #[serde(default = "default_max_achievements")]
    pub max_achievements_per_experience: usize,
    /// Experiences beyond this many are rendered in summary format.
    #[serde(default = "default_detailed_limit")]
    pub detailed_experience_limit: usize,
    /// Achievements kept on a summary-format experience.
    #[serde(default = "default_condensed_achievements")]
    pub condensed_achievements: usize,
}

fn default_max_achievements() -> usize {
    5
}

fn default_detailed_limit() -> usize {
    3
}

fn default_condensed_achievements() -> usize {
    1
}

impl LayoutBudget {
    pub fn new(max_total_units: u32) -> Self {
        Self {
            max_total_units,
            per_section_caps: BTreeMap::new(),
            type_weights: BTreeMap::new(),
            nested_achievement_weight: 0,
            max_achievements_per_experience: default_max_achievements(),
            detailed_experience_limit: default_detailed_limit(),
            condensed_achievements: default_condensed_achievements(),
        }
    }

    pub fn with_cap(mut self, section: Section, cap: u32) -> Self {
        self.per_section_caps.insert(section, cap);
        self
    }

    pub fn with_weight(mut self, unit_type: UnitType, weight: u32) -> Self {
        self.type_weights.insert(unit_type, weight);
        self
    }

    pub fn section_cap(&self, section: Section) -> Option<u32> {
        self.per_section_caps.get(&section).copied()
    }

    pub fn weight(&self, unit_type: UnitType) -> u32 {
        self.type_weights.get(&unit_type).copied().unwrap_or(1)
    }

    /// Units consumed by an entry of `unit_type` keeping `achievements` nested bullets.
    pub fn entry_cost(&self, unit_type: UnitType, achievements: usize) -> u32 {
        let nested = u32::try_from(achievements)
            .unwrap_or(u32::MAX)
            .saturating_mul(self.nested_achievement_weight);
        self.weight(unit_type).saturating_add(nested)
    }
}
