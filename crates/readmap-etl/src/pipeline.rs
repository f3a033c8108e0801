use readmap_core::model::BookId;
use readmap_core::BookStore;

use crate::backfill::{backfill_embeddings, BackfillOptions, BackfillReport};
use crate::embed::EmbeddingProvider;
use crate::error::PipelineResult;
use crate::load::bulk_load;
use crate::source::RecordSource;

/// Result of a full seeding run.
#[derive(Debug)]
pub struct SeedReport {
    pub inserted: Vec<BookId>,
    /// `None` when the backfill was not requested.
    pub backfill: Option<BackfillReport>,
}

/// Load records, insert them, then backfill embeddings.
///
/// The source is fully read and validated before anything is inserted, so
/// a bad input file leaves the store untouched. The backfill covers every
/// book still missing an embedding, not only the ones just inserted.
pub async fn seed<S, P>(
    store: &S,
    source: &RecordSource,
    provider: Option<&P>,
    options: BackfillOptions,
) -> PipelineResult<SeedReport>
where
    S: BookStore + ?Sized,
    P: EmbeddingProvider + ?Sized,
{
    let records = source.load()?;
    let inserted = bulk_load(store, &records)?;

    let backfill = match provider {
        Some(provider) => Some(backfill_embeddings(store, provider, options).await?),
        None => {
            log::info!("Skipping embedding backfill");
            None
        }
    };

    Ok(SeedReport { inserted, backfill })
}
