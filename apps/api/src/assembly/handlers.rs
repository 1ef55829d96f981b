use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::assembly::fingerprint::fingerprint;
use crate::assembly::{assemble, AssembledResume};
use crate::diagnostics::{
    attach_assembly_diagnostics, build_loss_report, DocumentSnapshot, LossReport, NamedSnapshot,
};
use crate::errors::AppError;
use crate::layout::{find_template, LayoutBudget, Template, TemplateDescriptor, TEMPLATES};
use crate::models::content::ContentUnit;
use crate::models::history::CareerHistory;
use crate::models::lenient;
use crate::state::AppState;

/// Request body. Field values coalesce like the models they carry; only the
/// unit list shape and an explicit budget override are validated.
#[derive(Deserialize)]
pub struct AssembleRequest {
    /// Kept as raw JSON so a non-list payload is reported as a validation error.
    #[serde(default)]
    pub content_units: Value,
    #[serde(default, deserialize_with = "lenient::record")]
    pub history: CareerHistory,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub template: Option<String>,
    #[serde(default, deserialize_with = "deserialize_page_count")]
    pub page_count: Option<u8>,
    /// Overrides the template's budget entirely.
    #[serde(default)]
    pub budget: Option<Value>,
    /// Intermediate checkpoints, placed between `raw_input` and `final`.
    #[serde(default, deserialize_with = "lenient::record_list")]
    pub snapshots: Vec<NamedSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssembleResponse {
    pub run_id: Uuid,
    pub resume: AssembledResume,
    pub loss_report: LossReport,
    pub fingerprint: String,
    pub cached: bool,
}

#[derive(Deserialize)]
pub struct LossReportRequest {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub template: Option<String>,
    #[serde(default, deserialize_with = "lenient::record_list")]
    pub snapshots: Vec<NamedSnapshot>,
}

/// Numbers or numeric strings; out-of-range values saturate, the template clamps.
fn deserialize_page_count<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let pages = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(pages.map(|p| u8::try_from(p).unwrap_or(u8::MAX)))
}

/// GET /api/v1/layouts
pub async fn handle_list_layouts() -> Json<Vec<TemplateDescriptor>> {
    Json(TEMPLATES.iter().map(TemplateDescriptor::from).collect())
}

/// POST /api/v1/assemble
pub async fn handle_assemble(
    State(state): State<AppState>,
    payload: Result<Json<AssembleRequest>, JsonRejection>,
) -> Result<Json<AssembleResponse>, AppError> {
    let Json(req) = payload?;
    let run_id = Uuid::new_v4();
    let units = ContentUnit::list_from_value(&req.content_units)?;
    let template = resolve_template(req.template.as_deref(), &state)?;
    let budget = match req.budget {
        Some(Value::Null) | None => template.budget(req.page_count.unwrap_or(1)),
        Some(raw) => serde_json::from_value::<LayoutBudget>(raw)
            .map_err(|e| AppError::UnprocessableEntity(format!("Invalid budget override: {e}")))?,
    };

    let fingerprint = fingerprint(&units, &req.history, &budget)
        .map_err(|e| AppError::Internal(e.into()))?;

    let (resume, cached) = match cached_resume(&state, &fingerprint).await {
        Some(resume) => (resume, true),
        None => {
            let resume = assemble(&units, &req.history, &budget);
            store_resume(&state, &fingerprint, &resume).await;
            (resume, false)
        }
    };

    let mut snapshots = Vec::with_capacity(req.snapshots.len() + 2);
    snapshots.push(NamedSnapshot::new(
        "raw_input",
        DocumentSnapshot::from(&req.history),
    ));
    snapshots.extend(req.snapshots);
    snapshots.push(NamedSnapshot::new("final", DocumentSnapshot::from(&resume)));

    let mut loss_report = build_loss_report(&snapshots, template);
    attach_assembly_diagnostics(&mut loss_report, &resume);

    info!(
        %run_id,
        template = template.id,
        units = units.len(),
        selected = resume.metrics.selected_entries,
        excluded = resume.metrics.excluded_entries,
        unmatched = resume.matching.unmatched_unit_ids.len(),
        cached,
        "Assembly complete"
    );

    Ok(Json(AssembleResponse {
        run_id,
        resume,
        loss_report,
        fingerprint,
        cached,
    }))
}

/// POST /api/v1/assemble/loss-report
pub async fn handle_loss_report(
    State(state): State<AppState>,
    payload: Result<Json<LossReportRequest>, JsonRejection>,
) -> Result<Json<LossReport>, AppError> {
    let Json(req) = payload?;
    let template = resolve_template(req.template.as_deref(), &state)?;
    Ok(Json(build_loss_report(&req.snapshots, template)))
}

fn resolve_template(
    requested: Option<&str>,
    state: &AppState,
) -> Result<&'static Template, AppError> {
    let id = requested.unwrap_or(state.config.default_template.as_str());
    find_template(id).ok_or_else(|| AppError::NotFound(format!("Template '{id}' not found")))
}

/// Cache failures degrade to an uncached run.
async fn cached_resume(state: &AppState, fingerprint: &str) -> Option<AssembledResume> {
    match state.cache.get(fingerprint).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(resume) => Some(resume),
            Err(e) => {
                warn!("Discarding unreadable cache entry {fingerprint}: {e}");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!("Assembly cache lookup failed: {e:#}");
            None
        }
    }
}

async fn store_resume(state: &AppState, fingerprint: &str, resume: &AssembledResume) {
    let raw = match serde_json::to_string(resume) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Failed to serialize assembled resume for caching: {e}");
            return;
        }
    };
    if let Err(e) = state.cache.put(fingerprint, raw).await {
        warn!("Assembly cache write failed: {e:#}");
    }
}
