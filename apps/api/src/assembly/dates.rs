//! Date Normalizer — canonical year-month tokens and a single "present" anchor.
//!
//! Raw history dates are free-form strings: a bare year, a year-month in one of
//! several separators, a full ISO date, or a localized "ongoing" synonym.
//! Anything unrecognized is passed through untouched as an opaque value.

use std::fmt;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assembly::text::fold;
use crate::models::history::ExperienceRecord;

/// Folded spellings of "still ongoing" across the locales the product serves.
const ONGOING_SYNONYMS: &[&str] = &[
    // en
    "present",
    "current",
    "currently",
    "now",
    "ongoing",
    "today",
    "to date",
    // fr
    "aujourd'hui",
    "a ce jour",
    "actuel",
    "actuelle",
    "actuellement",
    "en cours",
    "en poste",
    "maintenant",
    // es
    "presente",
    "actualidad",
    "actual",
    "hoy",
    // de
    "heute",
    "bis heute",
    "aktuell",
    "derzeit",
    // it
    "attuale",
    "oggi",
    "in corso",
    // pt
    "atual",
    "atualmente",
    "o presente",
];

/// A normalized date: `YYYY-MM`, `YYYY`, or the raw string when unparseable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum DateValue {
    YearMonth { year: i32, month: u32 },
    Year(i32),
    Opaque(String),
}

impl DateValue {
    /// Month ordinal used to compare start dates. A bare year counts as January.
    pub fn ordinal(&self) -> Option<i32> {
        match self {
            DateValue::YearMonth { year, month } => Some(year * 12 + (*month as i32 - 1)),
            DateValue::Year(year) => Some(year * 12),
            DateValue::Opaque(_) => None,
        }
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateValue::YearMonth { year, month } => write!(f, "{year:04}-{month:02}"),
            DateValue::Year(year) => write!(f, "{year:04}"),
            DateValue::Opaque(raw) => f.write_str(raw),
        }
    }
}

impl From<DateValue> for String {
    fn from(value: DateValue) -> Self {
        value.to_string()
    }
}

impl From<String> for DateValue {
    fn from(raw: String) -> Self {
        parse_date_token(&raw).unwrap_or(DateValue::Opaque(raw))
    }
}

/// Canonical dates for one history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDates {
    pub start: Option<DateValue>,
    pub end: Option<DateValue>,
    pub is_current: bool,
}

/// An experience paired with its normalized dates. The source record is cloned,
/// never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedExperience {
    /// Position in the caller's history list.
    pub index: usize,
    pub record: ExperienceRecord,
    pub dates: NormalizedDates,
    /// True when the entry was flagged current but lost the single-current reduction.
    pub current_demoted: bool,
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})$").expect("year regex must compile"))
}

fn year_month_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{4})[-/.](\d{1,2})$").expect("year-month regex must compile")
    })
}

fn month_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})[-/.](\d{4})$").expect("month-year regex must compile")
    })
}

/// True when `raw` is one of the recognized "ongoing" synonyms.
pub fn is_ongoing(raw: &str) -> bool {
    let folded = fold(raw);
    ONGOING_SYNONYMS.contains(&folded.as_str())
}

/// Parses a concrete date shape. Returns `None` when the shape is unknown.
fn parse_date_token(raw: &str) -> Option<DateValue> {
    let trimmed = raw.trim();

    if let Some(caps) = year_re().captures(trimmed) {
        return caps[1].parse().ok().map(DateValue::Year);
    }

    let year_month = year_month_re()
        .captures(trimmed)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .or_else(|| {
            month_year_re()
                .captures(trimmed)
                .map(|caps| (caps[2].to_string(), caps[1].to_string()))
        });
    if let Some((year, month)) = year_month {
        let year: i32 = year.parse().ok()?;
        let month: u32 = month.parse().ok()?;
        return (1..=12)
            .contains(&month)
            .then_some(DateValue::YearMonth { year, month });
    }

    ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .map(|d| DateValue::YearMonth {
            year: d.year(),
            month: d.month(),
        })
}

/// Normalizes a single date string. Blank input is absent; unknown shapes are opaque.
pub fn normalize_date(raw: Option<&str>) -> Option<DateValue> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    Some(parse_date_token(raw).unwrap_or_else(|| DateValue::Opaque(raw.to_string())))
}

/// Normalizes one entry's raw date fields.
///
/// An "ongoing" synonym in the end field clears the end date and marks the entry
/// current. Any other end value wins over the asserted flag.
pub fn normalize_dates(
    start: Option<&str>,
    end: Option<&str>,
    asserted_current: bool,
) -> NormalizedDates {
    let start = normalize_date(start);

    let (end, is_current) = match end.map(str::trim).filter(|e| !e.is_empty()) {
        None => (None, asserted_current),
        Some(raw) if is_ongoing(raw) => (None, true),
        Some(raw) => (normalize_date(Some(raw)), false),
    };

    NormalizedDates {
        start,
        end,
        is_current,
    }
}

/// Returns a fresh, normalized copy of the experience list with at most one
/// entry left current.
///
/// Among entries still current after per-entry normalization, the one with the
/// latest resolvable start month wins; ties and unresolvable starts fall back to
/// list order.
pub fn normalize_history(experiences: &[ExperienceRecord]) -> Vec<NormalizedExperience> {
    let mut normalized: Vec<NormalizedExperience> = experiences
        .iter()
        .enumerate()
        .map(|(index, record)| NormalizedExperience {
            index,
            record: record.clone(),
            dates: normalize_dates(
                record.start_date.as_deref(),
                record.end_date.as_deref(),
                record.asserted_current(),
            ),
            current_demoted: false,
        })
        .collect();

    let winner = normalized
        .iter()
        .filter(|exp| exp.dates.is_current)
        .fold(None::<(usize, Option<i32>)>, |best, exp| {
            let ordinal = exp.dates.start.as_ref().and_then(DateValue::ordinal);
            match best {
                Some((_, best_ordinal)) if ordinal <= best_ordinal => best,
                _ => Some((exp.index, ordinal)),
            }
        })
        .map(|(index, _)| index);

    for exp in normalized.iter_mut() {
        if exp.dates.is_current && Some(exp.index) != winner {
            debug!(
                "Demoting current flag on '{}' (index {})",
                exp.record.label(),
                exp.index
            );
            exp.dates.is_current = false;
            exp.current_demoted = true;
        }
    }

    normalized
}
