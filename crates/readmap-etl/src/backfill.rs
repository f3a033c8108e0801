//! Incremental embedding backfill.
//!
//! Selects every book whose embedding is absent, embeds its description,
//! and writes the vector back with a single-book update. The "embedding is
//! absent" predicate is the only progress marker: a run can be interrupted
//! at any point and the next run resumes with exactly the books still
//! lacking an embedding.
//!
//! Per book the states are
//! `no embedding -> requested -> embedded | skipped | failed`. Skipped and
//! failed books keep no embedding. Failures are logged and never stop the
//! loop.

use readmap_core::model::BookId;
use readmap_core::BookStore;

use crate::embed::EmbeddingProvider;
use crate::error::{EmbedError, EmbedResult, PipelineResult};

/// What happened to one book during a backfill run.
#[derive(Debug)]
pub enum BackfillOutcome {
    /// The embedding was written.
    Embedded { id: BookId, dimensions: usize },
    /// No description to embed; nothing was written.
    Skipped { id: BookId },
    /// Embedding or the write-back failed; the book stays un-embedded and
    /// the next run picks it up again.
    Failed { id: BookId, error: EmbedError },
}

impl BackfillOutcome {
    pub fn id(&self) -> BookId {
        match self {
            Self::Embedded { id, .. } | Self::Skipped { id } | Self::Failed { id, .. } => *id,
        }
    }
}

/// Options for a backfill run.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackfillOptions {
    /// Request at most this many embeddings; the rest wait for a later run.
    /// Books without a description do not count towards it.
    pub limit: Option<usize>,
}

/// Per-book outcomes of a run, in processing order.
#[derive(Debug, Default)]
pub struct BackfillReport {
    pub outcomes: Vec<BackfillOutcome>,
}

impl BackfillReport {
    pub fn embedded(&self) -> usize {
        self.count(|o| matches!(o, BackfillOutcome::Embedded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, BackfillOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, BackfillOutcome::Failed { .. }))
    }

    /// Books that went through the loop.
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    fn count(&self, predicate: impl Fn(&BackfillOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(o)).count()
    }
}

/// Run the backfill over every book missing an embedding.
///
/// Only selecting the candidates can fail the whole run (the store is
/// unusable). Everything after that is per book.
pub async fn backfill_embeddings<S, P>(
    store: &S,
    provider: &P,
    options: BackfillOptions,
) -> PipelineResult<BackfillReport>
where
    S: BookStore + ?Sized,
    P: EmbeddingProvider + ?Sized,
{
    let candidates = store.books_missing_embedding()?;

    log::info!(
        "{} books without an embedding (model {})",
        candidates.len(),
        provider.model()
    );

    let mut report = BackfillReport::default();
    let mut requested = 0usize;
    for book in &candidates {
        let Some(text) = book.record.embeddable_text() else {
            log::warn!("Skipping book {}: no description field or empty text", book.id);
            report.outcomes.push(BackfillOutcome::Skipped { id: book.id });
            continue;
        };

        // The limit counts requests, so skipped books never use it up.
        if options.limit.is_some_and(|limit| requested >= limit) {
            continue;
        }
        requested += 1;

        let outcome = backfill_one(store, provider, book.id, text).await;
        report.outcomes.push(outcome);
    }

    if let Some(limit) = options.limit {
        log::info!("Requested {requested} embeddings (limit {limit})");
    }

    Ok(report)
}

async fn backfill_one<S, P>(store: &S, provider: &P, id: BookId, text: &str) -> BackfillOutcome
where
    S: BookStore + ?Sized,
    P: EmbeddingProvider + ?Sized,
{
    match embed_and_store(store, provider, &id, text).await {
        Ok(dimensions) => {
            log::info!("Updated book {id} ({dimensions} dimensions)");
            BackfillOutcome::Embedded { id, dimensions }
        }
        Err(error) => {
            log::warn!("Failed on book {id}: {error}");
            BackfillOutcome::Failed { id, error }
        }
    }
}

async fn embed_and_store<S, P>(store: &S, provider: &P, id: &BookId, text: &str) -> EmbedResult<usize>
where
    S: BookStore + ?Sized,
    P: EmbeddingProvider + ?Sized,
{
    let vectors = provider.embed(text).await?;

    // A single-text request yields one vector; anything past the first is ignored.
    let embedding = vectors
        .into_iter()
        .next()
        .filter(|vector| !vector.is_empty())
        .ok_or_else(|| EmbedError::EmptyResponse {
            source_name: "embedding provider".to_string(),
            model: provider.model().to_string(),
        })?;

    store.set_embedding(id, &embedding, provider.model())?;
    Ok(embedding.len())
}
