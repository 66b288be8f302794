//! The `GenerationBackend` trait: the seam to the hosted language model.

use anyhow::Result;
use async_trait::async_trait;

/// Decoding settings for one generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerateOptions {
    pub temperature: f32,
}

/// Text produced by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
}

/// A text-completion service.
///
/// Object-safe so the service layer and HTTP state can hold
/// `Arc<dyn GenerationBackend>`. Implementations make exactly one remote
/// call per [`generate`](GenerationBackend::generate) and never retry.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short identifier for logs (e.g. "gemini").
    fn name(&self) -> &str;

    /// Generate text for `prompt`.
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<Generation>;
}

// Compile-time assertion: GenerationBackend must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn GenerationBackend) {}
};
