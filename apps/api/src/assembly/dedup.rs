//! Deduplicator — merges units that denote the same entity.
//!
//! Entity level: experience units resolving to one history entry become one
//! block. Fact level: client names and sector groupings derived from history.
//! Only exact (folded) duplicates inside the same entity collapse; the same text
//! under two different experiences is legitimate and kept.

use std::collections::{BTreeMap, BTreeSet};

use crate::assembly::dates::{normalize_date, NormalizedExperience};
use crate::assembly::matcher::ResolutionStrategy;
use crate::assembly::resume::{
    Achievement, AssembledEntry, EntryFormat, ExperienceDetail, SectorGroup,
};
use crate::assembly::text::fold;
use crate::models::content::{ContentUnit, UnitType};
use crate::models::history::{ExperienceRecord, ReferenceClient};

/// An entry competing for a slot in its section.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Generation order of the earliest unit in the entry; the sort tie-breaker.
    pub order: usize,
    pub unit_type: UnitType,
    pub entry: AssembledEntry,
}

/// A unit of the experiences section together with its resolution.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedUnit<'a> {
    pub order: usize,
    pub unit: &'a ContentUnit,
    pub strategy: ResolutionStrategy,
    pub history_index: Option<usize>,
}

/// Merges resolved experience units into one candidate per history entry.
///
/// Unresolved units stay standalone and keep their own dates.
pub fn merge_experiences(
    resolved: &[ResolvedUnit<'_>],
    history: &[NormalizedExperience],
) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = Vec::new();
    // history index -> position in `candidates`
    let mut by_history: BTreeMap<usize, usize> = BTreeMap::new();
    let mut headed: BTreeSet<usize> = BTreeSet::new();

    for item in resolved {
        let unit = item.unit;
        let score = unit.score();

        let target = item
            .history_index
            .and_then(|idx| history.get(idx).map(|exp| (idx, exp)));

        let Some((history_index, exp)) = target else {
            if unit.text.trim().is_empty() {
                continue;
            }
            candidates.push(Candidate {
                order: item.order,
                unit_type: unit.unit_type,
                entry: standalone_entry(unit, Some(ResolutionStrategy::Unresolved)),
            });
            continue;
        };

        let position = *by_history.entry(history_index).or_insert_with(|| {
            candidates.push(Candidate {
                order: item.order,
                unit_type: UnitType::Header,
                entry: experience_entry(exp, item.strategy),
            });
            candidates.len() - 1
        });

        let candidate = &mut candidates[position];
        candidate.entry.unit_ids.push(unit.id.clone());
        candidate.entry.relevance_score = candidate.entry.relevance_score.max(score);

        let text = unit.text.trim();
        if text.is_empty() {
            continue;
        }

        if unit.unit_type == UnitType::Header {
            // First header wins; later ones only contribute their id and score.
            if headed.insert(position) {
                candidate.entry.text = text.to_string();
            }
            continue;
        }

        if let Some(detail) = candidate.entry.experience.as_mut() {
            push_achievement(detail, &unit.id, text, score);
        }
    }

    candidates
}

fn push_achievement(detail: &mut ExperienceDetail, unit_id: &str, text: &str, score: f64) {
    let folded = fold(text);
    match detail
        .achievements
        .iter_mut()
        .find(|existing| fold(&existing.text) == folded)
    {
        Some(existing) => existing.relevance_score = existing.relevance_score.max(score),
        None => detail.achievements.push(Achievement {
            unit_id: unit_id.to_string(),
            text: text.to_string(),
            relevance_score: score,
        }),
    }
}

fn experience_entry(exp: &NormalizedExperience, strategy: ResolutionStrategy) -> AssembledEntry {
    let record = &exp.record;
    AssembledEntry {
        key: record
            .persisted_id()
            .map(str::to_string)
            .unwrap_or_else(|| format!("history#{}", exp.index)),
        unit_ids: Vec::new(),
        text: record.label(),
        relevance_score: 0.0,
        source_id: record.persisted_id().map(str::to_string),
        resolution: Some(strategy),
        start_date: exp.dates.start.clone(),
        end_date: exp.dates.end.clone(),
        experience: Some(ExperienceDetail {
            history_index: exp.index,
            role: record.role.trim().to_string(),
            employer: record.employer.trim().to_string(),
            is_current: exp.dates.is_current,
            achievements: Vec::new(),
            clients: derive_clients(record),
            format: EntryFormat::Detailed,
        }),
    }
}

fn standalone_entry(unit: &ContentUnit, resolution: Option<ResolutionStrategy>) -> AssembledEntry {
    AssembledEntry {
        key: unit.id.clone(),
        unit_ids: vec![unit.id.clone()],
        text: unit.text.trim().to_string(),
        relevance_score: unit.score(),
        source_id: None,
        resolution,
        start_date: normalize_date(unit.start_date.as_deref()),
        end_date: normalize_date(unit.end_date.as_deref()),
        experience: None,
    }
}

/// Builds candidates for a non-experience section, collapsing identical texts.
///
/// The higher-scoring unit wins a collision (the earlier one on ties); the
/// loser's id is kept on the surviving entry.
pub fn collapse_section(units: &[(usize, &ContentUnit)]) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut by_text: BTreeMap<String, usize> = BTreeMap::new();

    for (order, unit) in units {
        let folded = fold(&unit.text);
        if folded.is_empty() {
            continue;
        }

        match by_text.get(&folded) {
            Some(&position) => {
                let existing = &mut candidates[position];
                existing.entry.unit_ids.push(unit.id.clone());
                if unit.score() > existing.entry.relevance_score {
                    existing.entry.relevance_score = unit.score();
                    existing.entry.text = unit.text.trim().to_string();
                    existing.unit_type = unit.unit_type;
                }
            }
            None => {
                by_text.insert(folded, candidates.len());
                candidates.push(Candidate {
                    order: *order,
                    unit_type: unit.unit_type,
                    entry: standalone_entry(unit, None),
                });
            }
        }
    }

    candidates
}

/// Client names for one experience.
///
/// Names equal to the employer are dropped only while another name remains;
/// a list is never emptied by that filter.
pub fn derive_clients(record: &ExperienceRecord) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut clients: Vec<String> = Vec::new();
    for name in &record.client_names {
        let trimmed = name.trim();
        let folded = fold(trimmed);
        if folded.is_empty() || seen.contains(&folded) {
            continue;
        }
        seen.push(folded);
        clients.push(trimmed.to_string());
    }

    let employer = fold(&record.employer);
    let others: Vec<String> = clients
        .iter()
        .filter(|name| fold(name) != employer)
        .cloned()
        .collect();

    if others.is_empty() {
        clients
    } else {
        others
    }
}

/// Groups reference clients by sector tag, in order of first appearance.
///
/// Clients without a sector are left out; no sector data gives an empty list.
pub fn group_sectors(clients: &[ReferenceClient]) -> Vec<SectorGroup> {
    let mut groups: Vec<SectorGroup> = Vec::new();
    let mut index: BTreeMap<String, usize> = BTreeMap::new();

    for client in clients {
        let name = client.name.trim();
        let Some(sector) = client.sector.as_deref().map(str::trim) else {
            continue;
        };
        if name.is_empty() || sector.is_empty() {
            continue;
        }

        let position = *index.entry(fold(sector)).or_insert_with(|| {
            groups.push(SectorGroup {
                sector: sector.to_string(),
                clients: Vec::new(),
            });
            groups.len() - 1
        });

        let group = &mut groups[position];
        let folded = fold(name);
        if !group.clients.iter().any(|c| fold(c) == folded) {
            group.clients.push(name.to_string());
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::dates::normalize_history;
    use crate::models::content::Section;

    fn unit(id: &str, unit_type: UnitType, text: &str, score: f64) -> ContentUnit {
        ContentUnit {
            id: id.to_string(),
            unit_type,
            section: Section::Experiences,
            text: text.to_string(),
            relevance_score: score,
            source_ref: None,
            start_date: None,
            end_date: None,
        }
    }

    fn record(id: &str, role: &str, employer: &str, clients: &[&str]) -> ExperienceRecord {
        ExperienceRecord {
            id: Some(id.to_string()),
            role: role.to_string(),
            employer: employer.to_string(),
            start_date: Some("2020-01".to_string()),
            client_names: clients.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    fn resolved<'a>(order: usize, unit: &'a ContentUnit, idx: Option<usize>) -> ResolvedUnit<'a> {
        ResolvedUnit {
            order,
            unit,
            strategy: if idx.is_some() {
                ResolutionStrategy::ExactId
            } else {
                ResolutionStrategy::Unresolved
            },
            history_index: idx,
        }
    }

    #[test]
    fn test_units_for_same_entry_merge() {
        let history = normalize_history(&[record("e1", "Architecte", "Orange", &[])]);
        let units = vec![
            unit("h", UnitType::Header, "Architecte Cloud - Orange", 60.0),
            unit("a1", UnitType::Achievement, "Migré 30 services vers Kubernetes", 90.0),
            unit("a2", UnitType::Achievement, "Réduit les coûts de 25%", 70.0),
        ];
        let items: Vec<_> = units
            .iter()
            .enumerate()
            .map(|(i, u)| resolved(i, u, Some(0)))
            .collect();

        let merged = merge_experiences(&items, &history);
        assert_eq!(merged.len(), 1, "one block per history entry");

        let entry = &merged[0].entry;
        assert_eq!(entry.text, "Architecte Cloud - Orange");
        assert_eq!(entry.relevance_score, 90.0);
        assert_eq!(entry.unit_ids, vec!["h", "a1", "a2"]);
        assert_eq!(entry.source_id.as_deref(), Some("e1"));
        assert_eq!(entry.start_date.as_ref().unwrap().to_string(), "2020-01");
        assert_eq!(entry.experience.as_ref().unwrap().achievements.len(), 2);
    }

    #[test]
    fn test_header_defaults_to_label() {
        let history = normalize_history(&[record("e1", "Architecte", "Orange", &[])]);
        let a = unit("a1", UnitType::Achievement, "Piloté la migration", 50.0);
        let merged = merge_experiences(&[resolved(0, &a, Some(0))], &history);
        assert_eq!(merged[0].entry.text, "Architecte - Orange");
    }

    #[test]
    fn test_duplicate_achievement_collapses_within_entry_only() {
        let history = normalize_history(&[
            record("e1", "Dev", "Acme", &[]),
            record("e2", "Dev", "Globex", &[]),
        ]);
        let a1 = unit("a1", UnitType::Achievement, "Mentored 4 juniors", 40.0);
        let a2 = unit("a2", UnitType::Achievement, "mentored 4 JUNIORS ", 75.0);
        let a3 = unit("a3", UnitType::Achievement, "Mentored 4 juniors", 30.0);

        let merged = merge_experiences(
            &[
                resolved(0, &a1, Some(0)),
                resolved(1, &a2, Some(0)),
                resolved(2, &a3, Some(1)),
            ],
            &history,
        );

        let first = merged[0].entry.experience.as_ref().unwrap();
        assert_eq!(first.achievements.len(), 1);
        assert_eq!(first.achievements[0].relevance_score, 75.0);
        let second = merged[1].entry.experience.as_ref().unwrap();
        assert_eq!(second.achievements.len(), 1, "same text elsewhere is kept");
    }

    #[test]
    fn test_unresolved_units_keep_own_dates() {
        let history = normalize_history(&[]);
        let mut u = unit("x", UnitType::Header, "Freelance consultant", 55.0);
        u.start_date = Some("2017".to_string());
        let merged = merge_experiences(&[resolved(0, &u, None)], &history);

        let entry = &merged[0].entry;
        assert_eq!(entry.resolution, Some(ResolutionStrategy::Unresolved));
        assert!(entry.experience.is_none());
        assert_eq!(entry.start_date.as_ref().unwrap().to_string(), "2017");
        assert!(entry.end_date.is_none(), "no date is fabricated");
    }

    #[test]
    fn test_collapse_section_keeps_best_score() {
        let mut a = unit("s1", UnitType::Skill, "Rust", 40.0);
        a.section = Section::Skills;
        let mut b = unit("s2", UnitType::Skill, "rust", 80.0);
        b.section = Section::Skills;
        let mut c = unit("s3", UnitType::Skill, "Kafka", 60.0);
        c.section = Section::Skills;

        let out = collapse_section(&[(0, &a), (1, &b), (2, &c)]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].entry.relevance_score, 80.0);
        assert_eq!(out[0].entry.text, "rust");
        assert_eq!(out[0].entry.unit_ids, vec!["s1", "s2"]);
        assert_eq!(out[0].order, 0);
    }

    #[test]
    fn test_client_fallback_to_self() {
        let exp = record("e1", "Analyste", "Société Générale", &["Société Générale"]);
        assert_eq!(derive_clients(&exp), vec!["Société Générale"]);
    }

    #[test]
    fn test_employer_dropped_when_alternatives_exist() {
        let exp = record(
            "e1",
            "Consultant",
            "Accenture",
            &["accenture", "Airbus", " Airbus ", "Safran"],
        );
        assert_eq!(derive_clients(&exp), vec!["Airbus", "Safran"]);
    }

    #[test]
    fn test_no_clients_stays_empty() {
        let exp = record("e1", "Consultant", "Accenture", &[]);
        assert!(derive_clients(&exp).is_empty());
    }

    #[test]
    fn test_sector_grouping() {
        let clients = vec![
            ReferenceClient {
                name: "Chanel".to_string(),
                sector: Some("Luxe".to_string()),
            },
            ReferenceClient {
                name: "BNP Paribas".to_string(),
                sector: Some("Finance".to_string()),
            },
            ReferenceClient {
                name: "Hermès".to_string(),
                sector: Some("luxe".to_string()),
            },
            ReferenceClient {
                name: "Inconnu".to_string(),
                sector: None,
            },
        ];
        let groups = group_sectors(&clients);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].sector, "Luxe");
        assert_eq!(groups[0].clients, vec!["Chanel", "Hermès"]);
        assert_eq!(groups[1].clients, vec!["BNP Paribas"]);
    }

    #[test]
    fn test_sector_grouping_empty_without_sectors() {
        let clients = vec![ReferenceClient {
            name: "Chanel".to_string(),
            sector: None,
        }];
        assert!(group_sectors(&clients).is_empty());
        assert!(group_sectors(&[]).is_empty());
    }
}
