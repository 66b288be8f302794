//! Generation backends: the [`GenerationBackend`] trait and the Gemini
//! client that implements it.
//!
//! ```text
//! create_fitness_plan
//!     |
//!     v
//! &dyn GenerationBackend --generate(prompt, {temperature})--> Generation { text }
//!     |
//!     +-- GeminiBackend  (POST /v1beta/models/{model}:generateContent)
//! ```

pub mod gemini;
pub mod trait_def;

pub use gemini::{GeminiBackend, GeminiConfig};
pub use trait_def::{GenerateOptions, Generation, GenerationBackend};
