use anyhow::Result;
use readmap_etl::Config;

use super::open_store;

pub fn show_status(config: &Config) -> Result<()> {
    let db = open_store(config)?;
    let counts = db.book_counts()?;

    println!("\n📊 Readmap Status\n");
    println!("  Database: {}", config.database_path.display());
    println!("  Books: {}", counts.total);
    println!("  Embedded: {}", counts.embedded);
    println!("  Waiting for an embedding: {}", counts.pending);
    println!("  Without a description: {}", counts.no_description);

    if counts.pending > 0 {
        println!("\n  Run `readmap backfill` to embed the waiting books");
    }

    Ok(())
}
