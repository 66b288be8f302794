//! Plan service layer.
//!
//! Validates a submitted form, asks the generation backend for a plan,
//! recovers the structured plan from the model's text, and persists it.
//! Every failure comes back as a [`PlanError`]; nothing is retried.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backend::{GenerateOptions, GenerationBackend};
use crate::error::{GenerationFailure, PlanError};
use crate::plan::prompt::{PLAN_TEMPERATURE, build_prompt};
use crate::plan::recovery::{RecoveryError, recover_plan};
use crate::plan::request::PlanForm;
use crate::plan::response::PlanResponse;
use crate::store::PlanStore;

/// A generated plan that was stored successfully.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPlan {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub plan: PlanResponse,
}

/// Generate and persist a fitness plan for a submitted form.
///
/// On [`PlanError::PersistenceFailed`] the generated plan is inside the
/// error so the caller can still show it.
pub async fn create_fitness_plan(
    backend: &dyn GenerationBackend,
    store: &dyn PlanStore,
    form: &PlanForm,
) -> Result<SavedPlan, PlanError> {
    let request = form.validate().inspect_err(|e| {
        info!(error = %e, "rejected plan form");
    })?;

    let prompt = build_prompt(&request);
    let options = GenerateOptions {
        temperature: PLAN_TEMPERATURE,
    };
    debug!(backend = backend.name(), prompt_len = prompt.len(), "requesting plan");

    let generation = backend.generate(&prompt, &options).await.map_err(|e| {
        warn!(backend = backend.name(), error = %format!("{e:#}"), "plan generation failed");
        PlanError::GenerationFailed(GenerationFailure::Backend(format!("{e:#}")))
    })?;

    let plan = recover_plan(&generation.text).map_err(|e| {
        match &e {
            RecoveryError::MalformedJson { raw, .. } => {
                error!(error = %e, raw = %raw, "model response was not valid JSON");
            }
            RecoveryError::SchemaViolation { .. } => {
                error!(error = %e, raw = %generation.text, "model response failed validation");
            }
        }
        PlanError::GenerationFailed(GenerationFailure::Recovery(e))
    })?;

    let record = request.to_new_record(&plan);
    match store.insert(&record).await {
        Ok(saved) => {
            info!(id = %saved.id, "fitness plan saved");
            Ok(SavedPlan {
                id: saved.id,
                created_at: saved.created_at,
                plan,
            })
        }
        Err(e) => {
            let message = format!("{e:#}");
            error!(error = %message, "failed to save generated plan");
            Err(PlanError::PersistenceFailed {
                plan: Box::new(plan),
                message,
            })
        }
    }
}
