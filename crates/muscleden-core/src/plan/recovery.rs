//! Recovery of a typed [`PlanResponse`] from a model's free-text answer.
//!
//! The model is asked for bare JSON but often wraps it in a markdown code
//! fence. Recovery strips such a fence, parses the remainder, and checks it
//! against the plan schema. Both failure modes are ordinary return values.

use serde_json::{Map, Value};
use url::Url;

use crate::error::{ErrorKind, FieldViolation, join_violations};
use crate::plan::response::{PlanResponse, VideoLink};

const FENCE: &str = "```";

/// Errors from turning model text into a [`PlanResponse`].
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    /// The text is not a JSON document even after fence stripping.
    #[error("the response was not valid JSON: {source}")]
    MalformedJson {
        /// Unmodified model text, kept for diagnostics.
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    /// The JSON does not have the plan's shape.
    #[error("the response did not match the plan schema: {}", join_violations(.violations))]
    SchemaViolation { violations: Vec<FieldViolation> },
}

impl RecoveryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedJson { .. } => ErrorKind::MalformedJson,
            Self::SchemaViolation { .. } => ErrorKind::SchemaViolation,
        }
    }
}

/// Remove one surrounding markdown code fence, if present.
///
/// Handles an opening fence with or without a `json` tag (any case) and a
/// closing fence, each optional, plus surrounding whitespace. Fences inside
/// the payload are left untouched.
pub fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix(FENCE) {
        let rest = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        };
        text = rest;
    }
    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest;
    }

    text.trim()
}

/// Parse and validate model output into a [`PlanResponse`].
pub fn recover_plan(raw: &str) -> Result<PlanResponse, RecoveryError> {
    let cleaned = strip_fences(raw);

    let value: Value =
        serde_json::from_str(cleaned).map_err(|source| RecoveryError::MalformedJson {
            raw: raw.to_string(),
            source,
        })?;

    validate_plan_value(&value)
}

/// Check a parsed JSON value against the plan schema.
///
/// - root: object
/// - `fitnessPlan`: required, non-empty string
/// - `youtubeLinks`: optional array of objects, each with a non-empty string
///   `title` and a string `url` that parses as an absolute URL
///
/// Unknown keys are ignored. All violations are reported, not just the first.
pub fn validate_plan_value(value: &Value) -> Result<PlanResponse, RecoveryError> {
    let Some(root) = value.as_object() else {
        return Err(RecoveryError::SchemaViolation {
            violations: vec![FieldViolation::new(
                "$",
                format!("expected an object, got {}", type_name(value)),
            )],
        });
    };

    let mut violations = Vec::new();

    let fitness_plan = required_non_empty_string(root, "fitnessPlan", "fitnessPlan", &mut violations);

    let youtube_links = match root.get("youtubeLinks") {
        None => None,
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| video_link(i, item, &mut violations))
                .collect::<Vec<_>>(),
        ),
        Some(other) => {
            violations.push(FieldViolation::new(
                "youtubeLinks",
                format!("expected an array, got {}", type_name(other)),
            ));
            None
        }
    };

    match fitness_plan {
        Some(fitness_plan) if violations.is_empty() => Ok(PlanResponse {
            fitness_plan,
            youtube_links,
        }),
        _ => Err(RecoveryError::SchemaViolation { violations }),
    }
}

fn video_link(index: usize, item: &Value, violations: &mut Vec<FieldViolation>) -> Option<VideoLink> {
    let path = format!("youtubeLinks[{index}]");
    let Some(obj) = item.as_object() else {
        violations.push(FieldViolation::new(
            path,
            format!("expected an object, got {}", type_name(item)),
        ));
        return None;
    };

    let title = required_non_empty_string(obj, "title", &format!("{path}.title"), violations);

    let url_path = format!("{path}.url");
    let url = match obj.get("url") {
        Some(Value::String(s)) => match Url::parse(s) {
            Ok(_) => Some(s.clone()),
            Err(e) => {
                violations.push(FieldViolation::new(url_path, format!("invalid url: {e}")));
                None
            }
        },
        Some(other) => {
            violations.push(FieldViolation::new(
                url_path,
                format!("expected a string, got {}", type_name(other)),
            ));
            None
        }
        None => {
            violations.push(FieldViolation::new(url_path, "required"));
            None
        }
    };

    Some(VideoLink {
        title: title?,
        url: url?,
    })
}

fn required_non_empty_string(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    violations: &mut Vec<FieldViolation>,
) -> Option<String> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::String(_)) => {
            violations.push(FieldViolation::new(path, "must not be empty"));
            None
        }
        Some(other) => {
            violations.push(FieldViolation::new(
                path,
                format!("expected a string, got {}", type_name(other)),
            ));
            None
        }
        None => {
            violations.push(FieldViolation::new(path, "required"));
            None
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
