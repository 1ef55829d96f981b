//! Built-in résumé templates and the budgets they resolve to.
//!
//! Each template declares a one-page budget and the fields its renderer never
//! shows. Multi-page layouts scale every cap except the summary.

use serde::{Deserialize, Serialize};

use crate::layout::budget::LayoutBudget;
use crate::models::content::{Section, UnitType};

pub const MAX_PAGES: u8 = 3;

/// History fields a template may leave out of the rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OmittableField {
    SocialLinks,
    SoftSkills,
    Languages,
    Pitch,
    Certifications,
}

impl OmittableField {
    pub const ALL: [OmittableField; 5] = [
        OmittableField::SocialLinks,
        OmittableField::SoftSkills,
        OmittableField::Languages,
        OmittableField::Pitch,
        OmittableField::Certifications,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OmittableField::SocialLinks => "social_links",
            OmittableField::SoftSkills => "soft_skills",
            OmittableField::Languages => "languages",
            OmittableField::Pitch => "pitch",
            OmittableField::Certifications => "certifications",
        }
    }
}

/// Static description of a template's one-page capacity.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub units_per_page: u32,
    pub caps_per_page: &'static [(Section, u32)],
    pub detailed_per_page: usize,
    pub max_achievements: usize,
    pub nested_achievement_weight: u32,
    pub type_weights: &'static [(UnitType, u32)],
    pub omitted_fields: &'static [OmittableField],
}

const STANDARD_CAPS: &[(Section, u32)] = &[
    (Section::Experiences, 4),
    (Section::Summary, 1),
    (Section::Skills, 10),
    (Section::Clients, 6),
    (Section::Projects, 2),
    (Section::Education, 3),
    (Section::Certifications, 3),
    (Section::Languages, 4),
    (Section::Other, 2),
];

pub const TEMPLATES: &[Template] = &[
    Template {
        id: "classic",
        name: "Classic (ATS-safe)",
        units_per_page: 30,
        caps_per_page: STANDARD_CAPS,
        detailed_per_page: 3,
        max_achievements: 5,
        nested_achievement_weight: 0,
        type_weights: &[],
        omitted_fields: &[OmittableField::SocialLinks, OmittableField::Pitch],
    },
    Template {
        id: "hacker",
        name: "Hacker",
        units_per_page: 32,
        caps_per_page: &[
            (Section::Experiences, 4),
            (Section::Summary, 1),
            (Section::Skills, 14),
            (Section::Clients, 4),
            (Section::Projects, 4),
            (Section::Education, 2),
            (Section::Certifications, 3),
            (Section::Languages, 3),
            (Section::Other, 2),
        ],
        detailed_per_page: 3,
        max_achievements: 4,
        nested_achievement_weight: 0,
        type_weights: &[],
        omitted_fields: &[OmittableField::SoftSkills],
    },
    Template {
        id: "researcher",
        name: "Researcher",
        units_per_page: 28,
        caps_per_page: &[
            (Section::Experiences, 3),
            (Section::Summary, 1),
            (Section::Skills, 8),
            (Section::Clients, 2),
            (Section::Projects, 4),
            (Section::Education, 4),
            (Section::Certifications, 4),
            (Section::Languages, 4),
            (Section::Other, 4),
        ],
        detailed_per_page: 2,
        max_achievements: 4,
        nested_achievement_weight: 0,
        type_weights: &[],
        omitted_fields: &[OmittableField::SocialLinks, OmittableField::SoftSkills],
    },
    Template {
        id: "operator",
        name: "Operator",
        units_per_page: 48,
        caps_per_page: STANDARD_CAPS,
        detailed_per_page: 3,
        max_achievements: 5,
        nested_achievement_weight: 1,
        type_weights: &[(UnitType::Header, 2)],
        omitted_fields: &[],
    },
    Template {
        id: "founder",
        name: "Founder",
        units_per_page: 26,
        caps_per_page: &[
            (Section::Experiences, 5),
            (Section::Summary, 1),
            (Section::Skills, 8),
            (Section::Clients, 8),
            (Section::Projects, 3),
            (Section::Education, 2),
            (Section::Certifications, 2),
            (Section::Languages, 2),
            (Section::Other, 1),
        ],
        detailed_per_page: 2,
        max_achievements: 3,
        nested_achievement_weight: 0,
        type_weights: &[],
        omitted_fields: &[OmittableField::Languages],
    },
];

pub fn find_template(id: &str) -> Option<&'static Template> {
    let id = id.trim();
    TEMPLATES.iter().find(|t| t.id.eq_ignore_ascii_case(id))
}

impl Template {
    /// Budget for `page_count` pages (clamped to `1..=MAX_PAGES`).
    pub fn budget(&self, page_count: u8) -> LayoutBudget {
        let pages = page_count.clamp(1, MAX_PAGES);
        let scale = u32::from(pages);

        let mut budget = LayoutBudget::new(self.units_per_page * scale);
        for (section, cap) in self.caps_per_page {
            let cap = match section {
                Section::Summary => *cap,
                _ => cap * scale,
            };
            budget = budget.with_cap(*section, cap);
        }
        for (unit_type, weight) in self.type_weights {
            budget = budget.with_weight(*unit_type, *weight);
        }
        budget.nested_achievement_weight = self.nested_achievement_weight;
        budget.max_achievements_per_experience = self.max_achievements;
        budget.detailed_experience_limit = self.detailed_per_page * usize::from(pages);
        budget
    }

    pub fn omits(&self, field: OmittableField) -> bool {
        self.omitted_fields.contains(&field)
    }
}

/// Serializable view of a template for the layouts endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDescriptor {
    pub id: String,
    pub name: String,
    pub omitted_fields: Vec<OmittableField>,
    pub budget: LayoutBudget,
}

impl From<&Template> for TemplateDescriptor {
    fn from(template: &Template) -> Self {
        Self {
            id: template.id.to_string(),
            name: template.name.to_string(),
            omitted_fields: template.omitted_fields.to_vec(),
            budget: template.budget(1),
        }
    }
}
