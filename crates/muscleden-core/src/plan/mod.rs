//! Fitness plans: input validation, prompt, response recovery, service
//! layer, and history.

pub mod history;
pub mod prompt;
pub mod recovery;
pub mod request;
pub mod response;
pub mod service;

pub use history::{HISTORY_LIMIT, PlanHistory, plan_history, plan_record};
pub use prompt::{PLAN_TEMPERATURE, build_prompt};
pub use recovery::{RecoveryError, recover_plan, strip_fences, validate_plan_value};
pub use request::{NumberInput, PlanForm, PlanRequest};
pub use response::{PlanResponse, VideoLink};
pub use service::{SavedPlan, create_fitness_plan};
