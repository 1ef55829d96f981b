use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::assembly::AssemblyError;
use crate::models::lenient;

/// Kind of generated text a content unit carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    Header,
    Summary,
    #[serde(alias = "realisation", alias = "bullet")]
    Achievement,
    Skill,
    Client,
    Project,
    Education,
    Certification,
    Language,
    #[serde(other)]
    Other,
}

/// Résumé section a unit is tagged with.
///
/// Variants are declared in budget priority order, so the derived `Ord` is the
/// order in which the selector spends the global budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    #[serde(alias = "experience")]
    Experiences,
    #[serde(alias = "pitch")]
    Summary,
    #[serde(alias = "skill", alias = "competences")]
    Skills,
    #[serde(alias = "client")]
    Clients,
    #[serde(alias = "project")]
    Projects,
    #[serde(alias = "formations")]
    Education,
    #[serde(alias = "certification")]
    Certifications,
    #[serde(alias = "language", alias = "langues")]
    Languages,
    #[serde(other)]
    Other,
}

impl Section {
    /// Every section, highest budget priority first.
    pub const PRIORITY: [Section; 9] = [
        Section::Experiences,
        Section::Summary,
        Section::Skills,
        Section::Clients,
        Section::Projects,
        Section::Education,
        Section::Certifications,
        Section::Languages,
        Section::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Experiences => "experiences",
            Section::Summary => "summary",
            Section::Skills => "skills",
            Section::Clients => "clients",
            Section::Projects => "projects",
            Section::Education => "education",
            Section::Certifications => "certifications",
            Section::Languages => "languages",
            Section::Other => "other",
        }
    }
}

/// One scored, typed, section-tagged piece of generated résumé text.
///
/// Every field coalesces: unknown or non-string `type`/`section` become `Other`,
/// numeric ids and dates are read as text, nulls become empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentUnit {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(
        rename = "type",
        alias = "unit_type",
        default = "default_unit_type",
        deserialize_with = "deserialize_unit_type"
    )]
    pub unit_type: UnitType,
    #[serde(default = "default_section", deserialize_with = "deserialize_section")]
    pub section: Section,
    #[serde(default, deserialize_with = "lenient::string")]
    pub text: String,
    #[serde(
        alias = "relevanceScore",
        default,
        deserialize_with = "deserialize_score"
    )]
    pub relevance_score: f64,
    #[serde(alias = "sourceRef", default, deserialize_with = "deserialize_source_ref")]
    pub source_ref: Option<String>,
    #[serde(alias = "startDate", default, deserialize_with = "lenient::opt_string")]
    pub start_date: Option<String>,
    #[serde(alias = "endDate", default, deserialize_with = "lenient::opt_string")]
    pub end_date: Option<String>,
}

fn default_unit_type() -> UnitType {
    UnitType::Other
}

fn default_section() -> Section {
    Section::Other
}

fn deserialize_unit_type<'de, D>(deserializer: D) -> Result<UnitType, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(tag_or(Value::deserialize(deserializer)?, UnitType::Other))
}

fn deserialize_section<'de, D>(deserializer: D) -> Result<Section, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(tag_or(Value::deserialize(deserializer)?, Section::Other))
}

/// Parses a string tag (case-insensitive); anything else is `fallback`.
fn tag_or<T: DeserializeOwned>(value: Value, fallback: T) -> T {
    match value {
        Value::String(tag) => {
            serde_json::from_value(Value::String(tag.trim().to_lowercase())).unwrap_or(fallback)
        }
        _ => fallback,
    }
}

impl ContentUnit {
    /// Parses the top-level unit list.
    ///
    /// The list itself and each element's object shape are the only things
    /// checked strictly; missing or odd field values coalesce to defaults, so
    /// a field-level error here would mean two aliases of one field were sent.
    pub fn list_from_value(value: &Value) -> Result<Vec<ContentUnit>, AssemblyError> {
        let items = value.as_array().ok_or(AssemblyError::NotAList)?;

        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                if !item.is_object() {
                    return Err(AssemblyError::MalformedUnit {
                        index,
                        reason: "expected a JSON object".to_string(),
                    });
                }
                serde_json::from_value(item.clone()).map_err(|e| AssemblyError::MalformedUnit {
                    index,
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    /// Score clamped into `0..=100`, NaN treated as zero.
    pub fn score(&self) -> f64 {
        clamp_score(self.relevance_score)
    }
}

pub(crate) fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

/// Accepts numbers, numeric strings and null; anything else scores zero.
fn deserialize_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let score = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(clamp_score(score))
}

/// Source references arrive as strings or bare integers; blank means absent.
fn deserialize_source_ref<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let source_ref = match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    Ok(source_ref)
}
