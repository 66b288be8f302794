//! Listing of previously generated plans.

use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use muscleden_db::models::{PlanRecord, PlanSummary};

use crate::error::PlanError;
use crate::store::PlanStore;

/// Maximum number of entries returned by [`plan_history`].
pub const HISTORY_LIMIT: usize = 20;

/// Result of a history lookup. A failed lookup still yields a (empty) list
/// so a page can render, with the failure in `error`.
#[derive(Debug, Serialize)]
pub struct PlanHistory {
    pub plans: Vec<PlanSummary>,
    #[serde(skip)]
    pub error: Option<PlanError>,
}

impl PlanHistory {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// The [`HISTORY_LIMIT`] most recent plans, newest first.
pub async fn plan_history(store: &dyn PlanStore) -> PlanHistory {
    match store.query_recent(HISTORY_LIMIT).await {
        Ok(plans) => {
            info!(count = plans.len(), "loaded plan history");
            PlanHistory { plans, error: None }
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "failed to load plan history");
            PlanHistory {
                plans: Vec::new(),
                error: Some(PlanError::QueryFailed(format!("{e:#}"))),
            }
        }
    }
}

/// A single stored plan, including its body and links.
pub async fn plan_record(store: &dyn PlanStore, id: Uuid) -> Result<Option<PlanRecord>, PlanError> {
    store.get(id).await.map_err(|e| {
        error!(%id, error = %format!("{e:#}"), "failed to load plan record");
        PlanError::QueryFailed(format!("{e:#}"))
    })
}
