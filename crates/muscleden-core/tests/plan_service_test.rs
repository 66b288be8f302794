//! End-to-end plan service scenarios with scripted backends and in-memory
//! stores.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use muscleden_core::backend::{GenerateOptions, Generation, GenerationBackend};
use muscleden_core::plan::{
    HISTORY_LIMIT, PLAN_TEMPERATURE, PlanForm, create_fitness_plan, plan_history, plan_record,
};
use muscleden_core::store::PlanStore;
use muscleden_core::{ErrorKind, PlanError};
use muscleden_db::models::{NewPlanRecord, PlanRecord, PlanSummary};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Returns a fixed reply (or failure) and records every call.
struct ScriptedBackend {
    reply: Result<String, String>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
    last_temperature: Mutex<Option<f32>>,
}

impl ScriptedBackend {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
            last_temperature: Mutex::new(None),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            ..Self::replying("")
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<Generation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        *self.last_temperature.lock().unwrap() = Some(options.temperature);
        match &self.reply {
            Ok(text) => Ok(Generation { text: text.clone() }),
            Err(message) => bail!("{message}"),
        }
    }
}

#[derive(Default)]
struct MemoryStore {
    records: Mutex<Vec<PlanRecord>>,
}

impl MemoryStore {
    fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    fn push(&self, record: PlanRecord) {
        self.records.lock().unwrap().push(record);
    }
}

#[async_trait]
impl PlanStore for MemoryStore {
    async fn insert(&self, record: &NewPlanRecord) -> Result<PlanRecord> {
        let saved = PlanRecord {
            id: Uuid::new_v4(),
            name: record.name.clone(),
            age: record.age,
            weight: record.weight,
            height: record.height,
            fitness_goals: record.fitness_goals.clone(),
            exercise_preference: record.exercise_preference.clone(),
            fitness_plan: record.fitness_plan.clone(),
            youtube_links: Json(record.youtube_links.clone()),
            created_at: Utc::now(),
        };
        self.push(saved.clone());
        Ok(saved)
    }

    async fn query_recent(&self, limit: usize) -> Result<Vec<PlanSummary>> {
        let mut records = self.records.lock().unwrap().clone();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records
            .into_iter()
            .take(limit)
            .map(|r| PlanSummary {
                id: r.id,
                name: r.name,
                created_at: r.created_at,
                fitness_goals: r.fitness_goals,
            })
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<PlanRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }
}

/// Every operation fails, as if the database were unreachable.
struct UnreachableStore;

#[async_trait]
impl PlanStore for UnreachableStore {
    async fn insert(&self, _record: &NewPlanRecord) -> Result<PlanRecord> {
        bail!("connection refused")
    }

    async fn query_recent(&self, _limit: usize) -> Result<Vec<PlanSummary>> {
        bail!("connection refused")
    }

    async fn get(&self, _id: Uuid) -> Result<Option<PlanRecord>> {
        bail!("connection refused")
    }
}

fn jane() -> PlanForm {
    PlanForm {
        name: "Jane Doe".to_string(),
        age: Some(30.0.into()),
        weight: Some(65.0.into()),
        height: Some(168.0.into()),
        fitness_goals: "lose 5kg in 2 months".to_string(),
        exercise_preference: None,
    }
}

const FENCED_REPLY: &str = "```json\n{\"fitnessPlan\":\"# Plan\\n...\",\"youtubeLinks\":[{\"title\":\"Meal Prep\",\"url\":\"https://youtube.com/watch?v=abc\"}]}\n```";

// ---------------------------------------------------------------------------
// Plan generation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fenced_reply_is_recovered_and_saved() {
    let backend = ScriptedBackend::replying(FENCED_REPLY);
    let store = MemoryStore::default();

    let saved = create_fitness_plan(&backend, &store, &jane()).await.unwrap();

    assert_eq!(saved.plan.fitness_plan, "# Plan\n...");
    let links = saved.plan.links_or_empty();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].title, "Meal Prep");
    assert_eq!(links[0].url, "https://youtube.com/watch?v=abc");

    assert_eq!(store.len(), 1);
    let stored = store.get(saved.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Jane Doe");
    assert_eq!(stored.age, 30.0);
    assert_eq!(stored.weight, 65.0);
    assert_eq!(stored.height, 168.0);
    assert_eq!(stored.fitness_plan, "# Plan\n...");
    assert_eq!(stored.youtube_links.0, links);
    assert_eq!(stored.created_at, saved.created_at);
}

#[tokio::test]
async fn prompt_and_temperature_reach_backend() {
    let backend = ScriptedBackend::replying(r##"{"fitnessPlan":"# Plan"}"##);
    let store = MemoryStore::default();
    let mut form = jane();
    form.exercise_preference = Some("yoga".to_string());

    create_fitness_plan(&backend, &store, &form).await.unwrap();

    assert_eq!(backend.calls(), 1);
    assert_eq!(*backend.last_temperature.lock().unwrap(), Some(PLAN_TEMPERATURE));
    let prompt = backend.last_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("Jane Doe"), "{prompt}");
    assert!(prompt.contains("lose 5kg in 2 months"), "{prompt}");
    assert!(prompt.contains("Exercise Preference: yoga"), "{prompt}");
}

#[tokio::test]
async fn plan_without_links_is_saved_with_empty_list() {
    let backend = ScriptedBackend::replying(r##"{"fitnessPlan":"# Plan"}"##);
    let store = MemoryStore::default();

    let saved = create_fitness_plan(&backend, &store, &jane()).await.unwrap();

    assert!(saved.plan.youtube_links.is_none());
    let stored = store.get(saved.id).await.unwrap().unwrap();
    assert!(stored.youtube_links.0.is_empty());
}

#[tokio::test]
async fn invalid_form_never_calls_backend() {
    let backend = ScriptedBackend::replying(FENCED_REPLY);
    let store = MemoryStore::default();
    let form = PlanForm {
        name: "J".to_string(),
        ..jane()
    };

    let err = create_fitness_plan(&backend, &store, &form)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    let fields: Vec<&str> = err.violations().iter().map(|v| v.field.as_str()).collect();
    assert_eq!(fields, ["name"]);
    assert_eq!(backend.calls(), 0);
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn prose_reply_is_generation_failure_and_nothing_saved() {
    let backend = ScriptedBackend::replying("Sure! Here is your plan: ...");
    let store = MemoryStore::default();

    let err = create_fitness_plan(&backend, &store, &jane())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::GenerationFailed);
    assert_eq!(err.detail_kind(), ErrorKind::MalformedJson);
    assert!(err.user_message().starts_with("AI Error: "), "{}", err.user_message());
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn schema_violation_is_generation_failure() {
    let backend = ScriptedBackend::replying(
        r##"{"fitnessPlan":"# Plan","youtubeLinks":[{"title":"x","url":"not a url"}]}"##,
    );
    let store = MemoryStore::default();

    let err = create_fitness_plan(&backend, &store, &jane())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::GenerationFailed);
    assert_eq!(err.detail_kind(), ErrorKind::SchemaViolation);
    assert_eq!(err.violations()[0].field, "youtubeLinks[0].url");
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn backend_failure_is_generation_failure() {
    let backend = ScriptedBackend::failing("HTTP 503: overloaded");
    let store = MemoryStore::default();

    let err = create_fitness_plan(&backend, &store, &jane())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::GenerationFailed);
    assert_eq!(err.detail_kind(), ErrorKind::GenerationFailed);
    assert!(err.to_string().contains("overloaded"), "{err}");
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn unreachable_store_keeps_generated_plan() {
    let backend = ScriptedBackend::replying(FENCED_REPLY);

    let err = create_fitness_plan(&backend, &UnreachableStore, &jane())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PersistenceFailed);
    let plan = err.recovered_plan().expect("plan should survive");
    assert_eq!(plan.fitness_plan, "# Plan\n...");
    assert!(
        err.user_message()
            .starts_with("Plan generated, but failed to save:"),
        "{}",
        err.user_message()
    );
    assert!(matches!(err, PlanError::PersistenceFailed { .. }));
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

fn backdated(name: &str, minutes_ago: i64) -> PlanRecord {
    PlanRecord {
        id: Uuid::new_v4(),
        name: name.to_string(),
        age: 30.0,
        weight: 65.0,
        height: 168.0,
        fitness_goals: "build strength".to_string(),
        exercise_preference: None,
        fitness_plan: "# Plan".to_string(),
        youtube_links: Json(Vec::new()),
        created_at: Utc::now() - Duration::minutes(minutes_ago),
    }
}

#[tokio::test]
async fn history_returns_newest_twenty() {
    let store = MemoryStore::default();
    for i in 0..25 {
        store.push(backdated(&format!("user-{i:02}"), i));
    }

    let history = plan_history(&store).await;

    assert!(history.is_ok());
    assert_eq!(history.plans.len(), HISTORY_LIMIT);
    assert_eq!(history.plans[0].name, "user-00");
    assert_eq!(history.plans[HISTORY_LIMIT - 1].name, "user-19");
    assert!(
        history
            .plans
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at)
    );
}

#[tokio::test]
async fn history_of_empty_store_is_empty() {
    let history = plan_history(&MemoryStore::default()).await;
    assert!(history.is_ok());
    assert!(history.plans.is_empty());
}

#[tokio::test]
async fn history_failure_yields_empty_list_and_error() {
    let history = plan_history(&UnreachableStore).await;

    assert!(history.plans.is_empty());
    let err = history.error.expect("error should be reported");
    assert_eq!(err.kind(), ErrorKind::QueryFailed);
    assert!(err.to_string().contains("connection refused"), "{err}");
}

#[tokio::test]
async fn plan_record_lookup() {
    let store = MemoryStore::default();
    let record = backdated("Jane Doe", 0);
    let id = record.id;
    store.push(record);

    let found = plan_record(&store, id).await.unwrap().unwrap();
    assert_eq!(found.name, "Jane Doe");
    assert!(plan_record(&store, Uuid::new_v4()).await.unwrap().is_none());

    let err = plan_record(&UnreachableStore, id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QueryFailed);
}
