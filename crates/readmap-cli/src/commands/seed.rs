use anyhow::Result;
use readmap_etl::{seed, BackfillOptions, Config, GeminiClient, RecordSource};

use super::{open_store, print_backfill_summary};

pub async fn run_seed(
    config: &Config,
    source: RecordSource,
    skip_backfill: bool,
    options: BackfillOptions,
) -> Result<()> {
    // Fail on a missing key before anything is written.
    let client = if skip_backfill {
        None
    } else {
        Some(GeminiClient::from_config(config)?)
    };

    let db = open_store(config)?;

    log::info!("Seeding from {}", source);
    let report = seed(&db, &source, client.as_ref(), options).await?;

    println!("\n✓ Inserted {} books", report.inserted.len());

    match report.backfill {
        Some(backfill) => {
            println!("\nEmbedding backfill ({} books processed)", backfill.processed());
            print_backfill_summary(&backfill);
        }
        None => {
            println!("\nEmbeddings not requested; run `readmap backfill` when ready");
        }
    }

    Ok(())
}
