//! Submitted form input and its validated form, [`PlanRequest`].

use serde::{Deserialize, Serialize};

use muscleden_db::models::NewPlanRecord;

use crate::error::{FieldViolation, PlanError};
use crate::plan::response::PlanResponse;

pub const MIN_NAME_CHARS: usize = 2;
pub const MIN_GOALS_CHARS: usize = 10;

/// A numeric form field as submitted: either a JSON number or the raw text
/// of an input box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(f64),
    Text(String),
}

impl NumberInput {
    /// Coerce to a number the way an HTML form does: blank text is zero,
    /// unparseable text is NaN.
    pub fn coerce(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
        }
    }
}

impl From<f64> for NumberInput {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for NumberInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Raw plan form as submitted by a browser, API client, or the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: Option<NumberInput>,
    /// Kilograms.
    #[serde(default)]
    pub weight: Option<NumberInput>,
    /// Centimetres.
    #[serde(default)]
    pub height: Option<NumberInput>,
    #[serde(default)]
    pub fitness_goals: String,
    #[serde(default)]
    pub exercise_preference: Option<String>,
}

/// Validated plan input. Only obtainable through [`PlanForm::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    name: String,
    age: f64,
    weight_kg: f64,
    height_cm: f64,
    fitness_goals: String,
    exercise_preference: Option<String>,
}

fn positive(value: Option<&NumberInput>) -> Option<f64> {
    let n = value.map_or(f64::NAN, NumberInput::coerce);
    (n.is_finite() && n > 0.0).then_some(n)
}

impl PlanForm {
    /// Check every field and collect all violations, in form order.
    pub fn validate(&self) -> Result<PlanRequest, PlanError> {
        let mut issues = Vec::new();

        if self.name.chars().count() < MIN_NAME_CHARS {
            issues.push(FieldViolation::new(
                "name",
                "Name must be at least 2 characters.",
            ));
        }

        let age = positive(self.age.as_ref());
        if age.is_none() {
            issues.push(FieldViolation::new("age", "Please enter a valid age."));
        }
        let weight = positive(self.weight.as_ref());
        if weight.is_none() {
            issues.push(FieldViolation::new(
                "weight",
                "Please enter a valid weight in kg.",
            ));
        }
        let height = positive(self.height.as_ref());
        if height.is_none() {
            issues.push(FieldViolation::new(
                "height",
                "Please enter a valid height in cm.",
            ));
        }

        if self.fitness_goals.chars().count() < MIN_GOALS_CHARS {
            issues.push(FieldViolation::new(
                "fitnessGoals",
                "Please describe your fitness goals in at least 10 characters.",
            ));
        }

        match (age, weight, height) {
            (Some(age), Some(weight_kg), Some(height_cm)) if issues.is_empty() => {
                Ok(PlanRequest {
                    name: self.name.clone(),
                    age,
                    weight_kg,
                    height_cm,
                    fitness_goals: self.fitness_goals.clone(),
                    exercise_preference: self
                        .exercise_preference
                        .as_ref()
                        .filter(|p| !p.trim().is_empty())
                        .cloned(),
                })
            }
            _ => Err(PlanError::InvalidInput { issues }),
        }
    }
}

impl PlanRequest {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn age(&self) -> f64 {
        self.age
    }

    pub fn weight_kg(&self) -> f64 {
        self.weight_kg
    }

    pub fn height_cm(&self) -> f64 {
        self.height_cm
    }

    pub fn fitness_goals(&self) -> &str {
        &self.fitness_goals
    }

    /// `None` when no preference was given or it was blank.
    pub fn exercise_preference(&self) -> Option<&str> {
        self.exercise_preference.as_deref()
    }

    /// Combine with a generated plan into the row to persist.
    pub fn to_new_record(&self, plan: &PlanResponse) -> NewPlanRecord {
        NewPlanRecord {
            name: self.name.clone(),
            age: self.age,
            weight: self.weight_kg,
            height: self.height_cm,
            fitness_goals: self.fitness_goals.clone(),
            exercise_preference: self.exercise_preference.clone(),
            fitness_plan: plan.fitness_plan.clone(),
            youtube_links: plan.links_or_empty(),
        }
    }
}
