use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

/// A video suggested alongside a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoLink {
    pub title: String,
    pub url: String,
}

/// A persisted plan: the submitted attributes, the generated plan, and the
/// server-assigned id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlanRecord {
    pub id: Uuid,
    pub name: String,
    pub age: f64,
    pub weight: f64,
    pub height: f64,
    pub fitness_goals: String,
    pub exercise_preference: Option<String>,
    pub fitness_plan: String,
    pub youtube_links: Json<Vec<VideoLink>>,
    pub created_at: DateTime<Utc>,
}

/// Listing projection of a [`PlanRecord`]. Excludes the plan body and links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub fitness_goals: String,
}

/// Column values for a new row. `id` and `created_at` come from the server.
#[derive(Debug, Clone)]
pub struct NewPlanRecord {
    pub name: String,
    pub age: f64,
    pub weight: f64,
    pub height: f64,
    pub fitness_goals: String,
    pub exercise_preference: Option<String>,
    pub fitness_plan: String,
    pub youtube_links: Vec<VideoLink>,
}
