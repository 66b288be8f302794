//! Persistence seam for generated plans.
//!
//! The plan service talks to a [`PlanStore`] trait object so it can be
//! driven against PostgreSQL in production and against in-memory or failing
//! stores in tests.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use muscleden_db::models::{NewPlanRecord, PlanRecord, PlanSummary};
use muscleden_db::queries::plan_records;

/// Storage for plan records.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Persist a record, returning it with its assigned id and timestamp.
    async fn insert(&self, record: &NewPlanRecord) -> Result<PlanRecord>;

    /// The `limit` most recently created records, newest first.
    async fn query_recent(&self, limit: usize) -> Result<Vec<PlanSummary>>;

    /// A single record by id.
    async fn get(&self, id: Uuid) -> Result<Option<PlanRecord>>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn PlanStore) {}
};

/// [`PlanStore`] backed by the `fitness_plans` table.
#[derive(Debug, Clone)]
pub struct PgPlanStore {
    pool: PgPool,
}

impl PgPlanStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn insert(&self, record: &NewPlanRecord) -> Result<PlanRecord> {
        plan_records::insert_plan_record(&self.pool, record).await
    }

    async fn query_recent(&self, limit: usize) -> Result<Vec<PlanSummary>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        plan_records::list_recent_plan_summaries(&self.pool, limit).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<PlanRecord>> {
        plan_records::get_plan_record(&self.pool, id).await
    }
}
