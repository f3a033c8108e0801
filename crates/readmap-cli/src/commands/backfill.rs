use anyhow::Result;
use readmap_core::schema::BookCounts;
use readmap_etl::{backfill_embeddings, BackfillOptions, Config, GeminiClient};

use super::{open_store, print_backfill_summary};

pub async fn run_backfill(config: &Config, options: BackfillOptions) -> Result<()> {
    let client = GeminiClient::from_config(config)?;
    let db = open_store(config)?;

    let counts = db.book_counts()?;
    let to_request = planned_requests(&counts, options);

    println!(
        "Embedding {} of {} waiting books with {} ({} without a description are skipped)...",
        to_request, counts.pending, config.embedding_model, counts.no_description
    );

    let report = backfill_embeddings(&db, &client, options).await?;

    println!("\n✓ Backfill complete ({} books processed)", report.processed());
    print_backfill_summary(&report);

    if to_request < counts.pending {
        println!(
            "\n  {} books are still waiting; run `readmap backfill` again",
            counts.pending - to_request
        );
    }

    Ok(())
}

/// How many embedding requests a run will make. Books without a description
/// are never requested, so only `pending` is capped by the limit.
fn planned_requests(counts: &BookCounts, options: BackfillOptions) -> u64 {
    options
        .limit
        .map_or(counts.pending, |limit| counts.pending.min(limit as u64))
}
