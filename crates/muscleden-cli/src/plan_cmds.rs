//! CLI handlers for plan commands.
//!
//! Implements:
//! - `muscleden generate ...`   -- generate, print, and save a plan
//! - `muscleden history`        -- list the most recent plans
//! - `muscleden show <plan-id>` -- print one saved plan

use anyhow::{Context, Result, bail};
use uuid::Uuid;

use muscleden_core::backend::GenerationBackend;
use muscleden_core::plan::{
    PlanForm, PlanResponse, VideoLink, create_fitness_plan, plan_history, plan_record,
};
use muscleden_core::store::PlanStore;
use muscleden_db::models::PlanSummary;

/// Form fields as given on the command line.
#[derive(Debug, Clone)]
pub struct GenerateArgs {
    pub name: String,
    pub age: String,
    pub weight: String,
    pub height: String,
    pub goals: String,
    pub preference: Option<String>,
}

impl GenerateArgs {
    fn into_form(self) -> PlanForm {
        PlanForm {
            name: self.name,
            age: Some(self.age.as_str().into()),
            weight: Some(self.weight.as_str().into()),
            height: Some(self.height.as_str().into()),
            fitness_goals: self.goals,
            exercise_preference: self.preference,
        }
    }
}

// -----------------------------------------------------------------------
// muscleden generate
// -----------------------------------------------------------------------

/// Generate a plan, print it, and report whether it was saved.
///
/// A plan that was generated but not saved is still printed, followed by
/// a warning, and the command fails.
pub async fn run_generate(
    backend: &dyn GenerationBackend,
    store: &dyn PlanStore,
    args: GenerateArgs,
) -> Result<()> {
    let form = args.into_form();
    println!("Generating plan with {}...", backend.name());

    match create_fitness_plan(backend, store, &form).await {
        Ok(saved) => {
            println!();
            print!("{}", format_plan(&saved.plan));
            println!();
            println!("Plan saved.");
            println!("  Plan ID: {}", saved.id);
            println!(
                "  Created: {}",
                saved.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            Ok(())
        }
        Err(e) => {
            if let Some(plan) = e.recovered_plan() {
                println!();
                print!("{}", format_plan(plan));
                println!();
                eprintln!("Warning: this plan was NOT saved.");
                bail!("{}", e.user_message());
            }
            let issues = e.violations();
            if !issues.is_empty() {
                eprintln!("{}", e.user_message());
                for issue in issues {
                    eprintln!("  - {issue}");
                }
                bail!("plan request rejected ({} issue(s))", issues.len());
            }
            bail!("{}", e.user_message())
        }
    }
}

/// Render a plan and its video links for the terminal.
pub fn format_plan(plan: &PlanResponse) -> String {
    let mut out = String::new();
    out.push_str(plan.fitness_plan.trim_end());
    out.push('\n');
    let links = plan.links_or_empty();
    if !links.is_empty() {
        out.push('\n');
        out.push_str(&format_links(&links));
    }
    out
}

fn format_links(links: &[VideoLink]) -> String {
    let mut out = String::from("Diet videos:\n");
    for link in links {
        out.push_str(&format!("  - {} <{}>\n", link.title, link.url));
    }
    out
}

// -----------------------------------------------------------------------
// muscleden history
// -----------------------------------------------------------------------

/// List the most recent plans, newest first.
pub async fn run_history(store: &dyn PlanStore) -> Result<()> {
    let history = plan_history(store).await;
    if let Some(err) = history.error {
        bail!("{}", err.user_message());
    }
    print!("{}", format_history(&history.plans));
    Ok(())
}

/// Render history entries as an aligned table.
pub fn format_history(plans: &[PlanSummary]) -> String {
    if plans.is_empty() {
        return "No plans found. Use `muscleden generate` to create one.\n".to_string();
    }

    // ID is always 36 chars (UUID); dates are "YYYY-MM-DD HH:MM".
    let id_w = 36;
    let date_w = 16;
    let name_w = plans
        .iter()
        .map(|p| p.name.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut out = format!(
        "{:<id_w$}  {:<date_w$}  {:<name_w$}  GOALS\n",
        "ID", "CREATED", "NAME"
    );
    for plan in plans {
        out.push_str(&format!(
            "{:<id_w$}  {:<date_w$}  {:<name_w$}  {}\n",
            plan.id,
            plan.created_at.format("%Y-%m-%d %H:%M").to_string(),
            plan.name,
            first_line(&plan.fitness_goals),
        ));
    }
    out
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

// -----------------------------------------------------------------------
// muscleden show <plan-id>
// -----------------------------------------------------------------------

/// Print one saved plan with the attributes it was generated for.
pub async fn run_show(store: &dyn PlanStore, plan_id: &str) -> Result<()> {
    let id = Uuid::parse_str(plan_id).with_context(|| format!("invalid plan ID: {plan_id}"))?;
    let record = plan_record(store, id)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?
        .with_context(|| format!("plan {id} not found"))?;

    println!("Plan: {} ({})", record.name, record.id);
    println!(
        "Created: {}",
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "Age: {}  Weight: {} kg  Height: {} cm",
        record.age, record.weight, record.height
    );
    println!("Goals: {}", record.fitness_goals);
    if let Some(pref) = &record.exercise_preference {
        println!("Preference: {pref}");
    }
    println!();
    let plan = PlanResponse {
        fitness_plan: record.fitness_plan,
        youtube_links: Some(record.youtube_links.0),
    };
    print!("{}", format_plan(&plan));
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn args_become_text_form_fields() {
        let form = GenerateArgs {
            name: "Jane Doe".to_string(),
            age: "30".to_string(),
            weight: "65.5".to_string(),
            height: "abc".to_string(),
            goals: "lose 5kg in 2 months".to_string(),
            preference: None,
        }
        .into_form();

        let err = form.validate().unwrap_err();
        let fields: Vec<&str> = err.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, ["height"]);
    }

    #[test]
    fn format_plan_lists_links() {
        let plan = PlanResponse {
            fitness_plan: "# Plan\n\n- squat\n".to_string(),
            youtube_links: Some(vec![VideoLink {
                title: "Meal Prep".to_string(),
                url: "https://youtube.com/watch?v=abc".to_string(),
            }]),
        };
        assert_eq!(
            format_plan(&plan),
            "# Plan\n\n- squat\n\nDiet videos:\n  - Meal Prep <https://youtube.com/watch?v=abc>\n"
        );
    }

    #[test]
    fn format_plan_without_links() {
        let plan = PlanResponse {
            fitness_plan: "# Plan".to_string(),
            youtube_links: Some(Vec::new()),
        };
        assert_eq!(format_plan(&plan), "# Plan\n");
    }

    #[test]
    fn format_history_empty() {
        assert!(format_history(&[]).starts_with("No plans found."));
    }

    #[test]
    fn format_history_aligns_columns() {
        let plans = vec![
            PlanSummary {
                id: Uuid::nil(),
                name: "Jane Doe".to_string(),
                created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
                fitness_goals: "run a marathon\nin under 4 hours".to_string(),
            },
            PlanSummary {
                id: Uuid::nil(),
                name: "Al".to_string(),
                created_at: Utc.with_ymd_and_hms(2026, 2, 28, 18, 5, 0).unwrap(),
                fitness_goals: "build strength".to_string(),
            },
        ];
        let out = format_history(&plans);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].contains("2026-03-01 09:30  Jane Doe  run a marathon"));
        assert!(lines[2].contains("2026-02-28 18:05  Al        build strength"));
        assert!(!out.contains("4 hours"));
    }
}
