//! Core logic for muscleden: turning a user's stats and goals into a
//! validated, persisted fitness plan.

pub mod backend;
pub mod error;
pub mod plan;
pub mod session;
pub mod store;

pub use error::{ErrorKind, FieldViolation, PlanError};
