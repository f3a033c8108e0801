//! Embedding providers.
//!
//! The backfill only depends on [`EmbeddingProvider`]; [`gemini`] holds the
//! HTTP implementation used in production.

pub mod gemini;

use async_trait::async_trait;

use crate::error::EmbedResult;

pub use gemini::GeminiClient;

/// A text-embedding capability for a single named model.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// The model every request is made against.
    fn model(&self) -> &str;

    /// Request embeddings for one text.
    ///
    /// Returns the vectors exactly as the provider listed them; a
    /// single-text request normally yields one. Callers decide what an
    /// empty list means.
    async fn embed(&self, text: &str) -> EmbedResult<Vec<Vec<f32>>>;
}
