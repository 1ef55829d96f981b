use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::lenient;

/// Structured career history as supplied by the caller.
///
/// Every field is optional on the wire. Sources disagree on shape (and on
/// language), so fields coalesce to defaults instead of failing: numbers are
/// read as text, nulls as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CareerHistory {
    #[serde(deserialize_with = "lenient::record_list")]
    pub experiences: Vec<ExperienceRecord>,
    #[serde(alias = "competences", deserialize_with = "lenient::string_list")]
    pub skills: Vec<String>,
    #[serde(alias = "softSkills", deserialize_with = "lenient::string_list")]
    pub soft_skills: Vec<String>,
    #[serde(alias = "formations", deserialize_with = "lenient::record_list")]
    pub education: Vec<EducationRecord>,
    #[serde(alias = "langues", deserialize_with = "lenient::record_list")]
    pub languages: Vec<LanguageRecord>,
    #[serde(deserialize_with = "lenient::record_list")]
    pub certifications: Vec<CertificationRecord>,
    #[serde(
        alias = "referenceClients",
        alias = "clients",
        deserialize_with = "lenient::record_list"
    )]
    pub reference_clients: Vec<ReferenceClient>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub summary: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub pitch: Option<String>,
    #[serde(alias = "socialLinks", deserialize_with = "lenient::string_list")]
    pub social_links: Vec<String>,
}

/// One experience in the candidate's history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceRecord {
    /// Persisted id; stores emit strings or integers.
    #[serde(deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(alias = "poste", alias = "title", deserialize_with = "lenient::string")]
    pub role: String,
    #[serde(
        alias = "entreprise",
        alias = "company",
        deserialize_with = "lenient::string"
    )]
    pub employer: String,
    #[serde(
        alias = "date_debut",
        alias = "startDate",
        deserialize_with = "lenient::opt_string"
    )]
    pub start_date: Option<String>,
    #[serde(
        alias = "date_fin",
        alias = "endDate",
        deserialize_with = "lenient::opt_string"
    )]
    pub end_date: Option<String>,
    #[serde(
        alias = "en_cours",
        alias = "isCurrent",
        alias = "current",
        deserialize_with = "deserialize_flag"
    )]
    pub is_current: Option<bool>,
    #[serde(alias = "realisations", deserialize_with = "lenient::string_list")]
    pub achievements: Vec<String>,
    #[serde(
        alias = "clients_references",
        alias = "clientNames",
        alias = "clients",
        deserialize_with = "lenient::string_list"
    )]
    pub client_names: Vec<String>,
}

impl ExperienceRecord {
    /// Persisted id, ignoring blank values.
    pub fn persisted_id(&self) -> Option<&str> {
        self.id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }

    pub fn asserted_current(&self) -> bool {
        self.is_current.unwrap_or(false)
    }

    /// `"<role> - <employer>"`, the label used in loss reports.
    pub fn label(&self) -> String {
        experience_label(&self.role, &self.employer)
    }
}

/// Accepts booleans, 0/1 and the usual yes/no spellings; anything else is unset.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let flag = match value {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "oui" | "si" | "ja" | "1" => Some(true),
            "false" | "no" | "non" | "nein" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    };
    Ok(flag)
}

pub fn experience_label(role: &str, employer: &str) -> String {
    format!("{} - {}", role.trim(), employer.trim())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationRecord {
    #[serde(alias = "diplome", alias = "degree", deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(alias = "ecole", alias = "school", deserialize_with = "lenient::string")]
    pub institution: String,
    #[serde(alias = "annee", deserialize_with = "lenient::opt_string")]
    pub year: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageRecord {
    #[serde(alias = "langue", alias = "language", deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(alias = "niveau", deserialize_with = "lenient::opt_string")]
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificationRecord {
    #[serde(alias = "nom", deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(alias = "organisme", deserialize_with = "lenient::opt_string")]
    pub issuer: Option<String>,
    #[serde(alias = "annee", deserialize_with = "lenient::opt_string")]
    pub year: Option<String>,
}

/// A client the candidate worked with, optionally tagged with a sector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceClient {
    #[serde(alias = "nom", deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(alias = "secteur", deserialize_with = "lenient::opt_string")]
    pub sector: Option<String>,
}
