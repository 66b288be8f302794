//! Database query functions for the `fitness_plans` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::{NewPlanRecord, PlanRecord, PlanSummary};

/// Insert a new plan record. Returns the row with its server-generated id
/// and `created_at`.
pub async fn insert_plan_record(pool: &PgPool, record: &NewPlanRecord) -> Result<PlanRecord> {
    let row = sqlx::query_as::<_, PlanRecord>(
        "INSERT INTO fitness_plans \
         (name, age, weight, height, fitness_goals, exercise_preference, fitness_plan, youtube_links) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING *",
    )
    .bind(&record.name)
    .bind(record.age)
    .bind(record.weight)
    .bind(record.height)
    .bind(&record.fitness_goals)
    .bind(&record.exercise_preference)
    .bind(&record.fitness_plan)
    .bind(Json(record.youtube_links.clone()))
    .fetch_one(pool)
    .await
    .context("failed to insert plan record")?;

    Ok(row)
}

/// Fetch a plan record by its ID.
pub async fn get_plan_record(pool: &PgPool, id: Uuid) -> Result<Option<PlanRecord>> {
    let row = sqlx::query_as::<_, PlanRecord>("SELECT * FROM fitness_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch plan record")?;

    Ok(row)
}

/// List the `limit` most recent plan summaries, newest first.
pub async fn list_recent_plan_summaries(pool: &PgPool, limit: i64) -> Result<Vec<PlanSummary>> {
    let rows = sqlx::query_as::<_, PlanSummary>(
        "SELECT id, name, created_at, fitness_goals \
         FROM fitness_plans \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("failed to list plan records")?;

    Ok(rows)
}

/// Count all stored plan records.
pub async fn count_plan_records(pool: &PgPool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fitness_plans")
        .fetch_one(pool)
        .await
        .context("failed to count plan records")?;

    Ok(count)
}
