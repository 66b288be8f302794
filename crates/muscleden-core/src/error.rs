//! Error taxonomy for plan generation and history.
//!
//! Every failure in the plan pipeline is returned to the caller as a
//! [`PlanError`]; none escapes as a panic.

use std::fmt;

use serde::Serialize;

use crate::plan::recovery::RecoveryError;
use crate::plan::response::PlanResponse;

/// A single field-level problem, either in submitted input or in the
/// model's structured output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Field path, e.g. `age` or `youtubeLinks[1].url`.
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub(crate) fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Machine-readable classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    MalformedJson,
    SchemaViolation,
    GenerationFailed,
    PersistenceFailed,
    QueryFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidInput => "invalid_input",
            Self::MalformedJson => "malformed_json",
            Self::SchemaViolation => "schema_violation",
            Self::GenerationFailed => "generation_failed",
            Self::PersistenceFailed => "persistence_failed",
            Self::QueryFailed => "query_failed",
        };
        f.write_str(s)
    }
}

/// Why a generation attempt produced no usable plan.
#[derive(Debug, thiserror::Error)]
pub enum GenerationFailure {
    /// The backend call itself failed (network, quota, timeout, bad status).
    #[error("{0}")]
    Backend(String),

    /// The backend answered but its text could not be turned into a plan.
    #[error(transparent)]
    Recovery(#[from] RecoveryError),
}

/// Errors returned by the plan service and history query.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("invalid form data: {}", join_violations(.issues))]
    InvalidInput { issues: Vec<FieldViolation> },

    #[error("plan generation failed: {0}")]
    GenerationFailed(GenerationFailure),

    /// The plan was generated but could not be stored. The plan is handed
    /// back so the caller can still show it.
    #[error("plan generated but not saved: {message}")]
    PersistenceFailed {
        plan: Box<PlanResponse>,
        message: String,
    },

    #[error("failed to load plan history: {0}")]
    QueryFailed(String),
}

impl PlanError {
    /// Top-level kind. Both backend and recovery failures report
    /// [`ErrorKind::GenerationFailed`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::GenerationFailed(_) => ErrorKind::GenerationFailed,
            Self::PersistenceFailed { .. } => ErrorKind::PersistenceFailed,
            Self::QueryFailed(_) => ErrorKind::QueryFailed,
        }
    }

    /// Most specific kind: the recovery sub-case for generation failures
    /// whose response could not be parsed or validated.
    pub fn detail_kind(&self) -> ErrorKind {
        match self {
            Self::GenerationFailed(GenerationFailure::Recovery(e)) => e.kind(),
            other => other.kind(),
        }
    }

    /// Field-level violations carried by this error, if any.
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            Self::InvalidInput { issues } => issues,
            Self::GenerationFailed(GenerationFailure::Recovery(
                RecoveryError::SchemaViolation { violations },
            )) => violations,
            _ => &[],
        }
    }

    /// The generated plan, when one exists despite the failure.
    pub fn recovered_plan(&self) -> Option<&PlanResponse> {
        match self {
            Self::PersistenceFailed { plan, .. } => Some(plan.as_ref()),
            _ => None,
        }
    }

    /// Text suitable for showing to the person who submitted the form.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput { .. } => "Invalid form data. Please check your inputs.".to_string(),
            Self::GenerationFailed(cause) => format!("AI Error: {cause}"),
            Self::PersistenceFailed { message, .. } => {
                format!("Plan generated, but failed to save: {message}")
            }
            Self::QueryFailed(message) => message.clone(),
        }
    }
}
