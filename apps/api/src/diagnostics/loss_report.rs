//! Loss Reporter — what got cut between pipeline stages.
//!
//! Algorithm:
//!   1. Walk caller-named snapshots pairwise, in the order given.
//!   2. For each pair, diff per-section counts, list dropped experiences by
//!      label, sum the achievement delta and measure long text fields.
//!   3. Flag the fields the target template never renders, with the number of
//!      items they hold in the last snapshot.
//!
//! Informational only: the report is derived from snapshots and never fed back.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::assembly::resume::{AssembledResume, ExcludedEntry};
use crate::assembly::text::fold;
use crate::layout::{OmittableField, Template};
use crate::models::content::Section;
use crate::models::history::{experience_label, CareerHistory};
use crate::models::lenient;

// ────────────────────────────────────────────────────────────────────────────
// Snapshots
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotExperience {
    #[serde(alias = "poste", deserialize_with = "lenient::string")]
    pub role: String,
    #[serde(alias = "entreprise", deserialize_with = "lenient::string")]
    pub employer: String,
    #[serde(alias = "realisations", deserialize_with = "lenient::string_list")]
    pub achievements: Vec<String>,
}

impl SnapshotExperience {
    /// `"<role> - <employer>"`, or the bare text of an entry with no employer.
    pub fn label(&self) -> String {
        if self.employer.trim().is_empty() {
            self.role.trim().to_string()
        } else {
            experience_label(&self.role, &self.employer)
        }
    }
}

/// Flattened view of a document at one pipeline checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSnapshot {
    #[serde(deserialize_with = "lenient::record_list")]
    pub experiences: Vec<SnapshotExperience>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub skills: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub soft_skills: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub certifications: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub education: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub languages: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub clients: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub social_links: Vec<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub summary: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub pitch: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedSnapshot {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::record")]
    pub snapshot: DocumentSnapshot,
}

impl NamedSnapshot {
    pub fn new(name: impl Into<String>, snapshot: DocumentSnapshot) -> Self {
        Self {
            name: name.into(),
            snapshot,
        }
    }
}

impl From<&CareerHistory> for DocumentSnapshot {
    fn from(history: &CareerHistory) -> Self {
        Self {
            experiences: history
                .experiences
                .iter()
                .map(|exp| SnapshotExperience {
                    role: exp.role.clone(),
                    employer: exp.employer.clone(),
                    achievements: exp.achievements.clone(),
                })
                .collect(),
            skills: history.skills.clone(),
            soft_skills: history.soft_skills.clone(),
            certifications: history.certifications.iter().map(|c| c.name.clone()).collect(),
            education: history.education.iter().map(|e| e.title.clone()).collect(),
            languages: history.languages.iter().map(|l| l.name.clone()).collect(),
            clients: history
                .reference_clients
                .iter()
                .map(|c| c.name.clone())
                .collect(),
            social_links: history.social_links.clone(),
            summary: history.summary.clone(),
            pitch: history.pitch.clone(),
        }
    }
}

impl From<&AssembledResume> for DocumentSnapshot {
    fn from(resume: &AssembledResume) -> Self {
        let texts = |section: Section| -> Vec<String> {
            resume
                .section(section)
                .iter()
                .map(|entry| entry.text.clone())
                .collect()
        };

        // Clients show up both as selected entries and inside sector groups.
        let mut clients = texts(Section::Clients);
        let mut seen: BTreeSet<String> = clients.iter().map(|c| fold(c)).collect();
        for group in &resume.sector_groups {
            for client in &group.clients {
                if seen.insert(fold(client)) {
                    clients.push(client.clone());
                }
            }
        }

        Self {
            // Unresolved units render as standalone experience lines, so they count too.
            experiences: resume
                .section(Section::Experiences)
                .iter()
                .map(|entry| match &entry.experience {
                    Some(exp) => SnapshotExperience {
                        role: exp.role.clone(),
                        employer: exp.employer.clone(),
                        achievements: exp.achievements.iter().map(|a| a.text.clone()).collect(),
                    },
                    None => SnapshotExperience {
                        role: entry.text.clone(),
                        ..Default::default()
                    },
                })
                .collect(),
            skills: texts(Section::Skills),
            soft_skills: resume.profile.soft_skills.clone(),
            certifications: texts(Section::Certifications),
            education: texts(Section::Education),
            languages: texts(Section::Languages),
            clients,
            social_links: resume.profile.social_links.clone(),
            summary: resume
                .section(Section::Summary)
                .first()
                .map(|entry| entry.text.clone()),
            pitch: resume.profile.pitch.clone(),
        }
    }
}

impl DocumentSnapshot {
    fn achievement_count(&self) -> usize {
        self.experiences.iter().map(|e| e.achievements.len()).sum()
    }

    fn counts(&self) -> [(&'static str, usize); 9] {
        [
            (Section::Experiences.as_str(), self.experiences.len()),
            ("realisations", self.achievement_count()),
            (Section::Skills.as_str(), self.skills.len()),
            (OmittableField::SoftSkills.as_str(), self.soft_skills.len()),
            (Section::Certifications.as_str(), self.certifications.len()),
            (Section::Education.as_str(), self.education.len()),
            (Section::Languages.as_str(), self.languages.len()),
            (Section::Clients.as_str(), self.clients.len()),
            (OmittableField::SocialLinks.as_str(), self.social_links.len()),
        ]
    }

    fn omittable_items(&self, field: OmittableField) -> usize {
        match field {
            OmittableField::SocialLinks => self.social_links.len(),
            OmittableField::SoftSkills => self.soft_skills.len(),
            OmittableField::Languages => self.languages.len(),
            OmittableField::Certifications => self.certifications.len(),
            OmittableField::Pitch => usize::from(non_blank(self.pitch.as_deref()).is_some()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Report
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossReport {
    pub template: String,
    pub stages: Vec<StageDiff>,
    pub omitted_fields: Vec<OmittedField>,
    #[serde(default)]
    pub unmatched_unit_ids: Vec<String>,
    #[serde(default)]
    pub excluded_entries: Vec<ExcludedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDiff {
    pub from: String,
    pub to: String,
    pub counts: Vec<SectionCountDelta>,
    pub removed: RemovedContent,
    pub text_fields: Vec<TextFieldDelta>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionCountDelta {
    pub section: String,
    pub before: usize,
    pub after: usize,
    pub delta: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedContent {
    /// `"<role> - <employer>"` of every experience missing from the later stage.
    pub experiences: Vec<String>,
    /// Aggregate achievement loss across all experiences.
    #[serde(rename = "realisations")]
    pub achievements: usize,
    pub skills: Vec<String>,
    pub certifications: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFieldDelta {
    pub field: String,
    pub before_chars: usize,
    pub after_chars: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OmittedField {
    pub field: OmittableField,
    pub items_lost: usize,
}

/// Diffs consecutive snapshots and applies the template's omission table.
pub fn build_loss_report(snapshots: &[NamedSnapshot], template: &Template) -> LossReport {
    let stages = snapshots
        .windows(2)
        .map(|pair| diff_stage(&pair[0], &pair[1]))
        .collect();

    let omitted_fields = match snapshots.last() {
        Some(last) => OmittableField::ALL
            .into_iter()
            .filter(|field| template.omits(*field))
            .map(|field| OmittedField {
                field,
                items_lost: last.snapshot.omittable_items(field),
            })
            .collect(),
        None => Vec::new(),
    };

    LossReport {
        template: template.id.to_string(),
        stages,
        omitted_fields,
        unmatched_unit_ids: Vec::new(),
        excluded_entries: Vec::new(),
    }
}

/// Copies the run's unmatched units and budget exclusions into the report.
pub fn attach_assembly_diagnostics(report: &mut LossReport, resume: &AssembledResume) {
    report.unmatched_unit_ids = resume.matching.unmatched_unit_ids.clone();
    report.excluded_entries = resume.excluded.clone();
}

fn diff_stage(before: &NamedSnapshot, after: &NamedSnapshot) -> StageDiff {
    let (b, a) = (&before.snapshot, &after.snapshot);

    let counts = b
        .counts()
        .iter()
        .zip(a.counts().iter())
        .map(|((section, before), (_, after))| SectionCountDelta {
            section: section.to_string(),
            before: *before,
            after: *after,
            delta: *after as i64 - *before as i64,
        })
        .collect();

    let removed = RemovedContent {
        experiences: missing(
            b.experiences.iter().map(SnapshotExperience::label),
            a.experiences.iter().map(SnapshotExperience::label),
        ),
        achievements: b.achievement_count().saturating_sub(a.achievement_count()),
        skills: missing(b.skills.iter().cloned(), a.skills.iter().cloned()),
        certifications: missing(
            b.certifications.iter().cloned(),
            a.certifications.iter().cloned(),
        ),
    };

    let text_fields = [
        ("summary", b.summary.as_deref(), a.summary.as_deref()),
        ("pitch", b.pitch.as_deref(), a.pitch.as_deref()),
    ]
    .into_iter()
    .filter(|(_, before, after)| before.is_some() || after.is_some())
    .map(|(field, before, after)| {
        let before_chars = before.map_or(0, |t| t.chars().count());
        let after_chars = after.map_or(0, |t| t.chars().count());
        TextFieldDelta {
            field: field.to_string(),
            before_chars,
            after_chars,
            truncated: after_chars < before_chars,
        }
    })
    .collect();

    StageDiff {
        from: before.name.clone(),
        to: after.name.clone(),
        counts,
        removed,
        text_fields,
    }
}

/// Items of `before` absent from `after`, compared folded, in `before` order.
fn missing(
    before: impl Iterator<Item = String>,
    after: impl Iterator<Item = String>,
) -> Vec<String> {
    let kept: BTreeSet<String> = after.map(|item| fold(&item)).collect();
    let mut reported = BTreeSet::new();
    before
        .filter(|item| {
            let key = fold(item);
            !kept.contains(&key) && reported.insert(key)
        })
        .collect()
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}
