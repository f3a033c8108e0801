pub mod backfill;
pub mod config;
pub mod search;
pub mod seed;
pub mod status;

pub use backfill::run_backfill;
pub use search::run_search;
pub use seed::run_seed;
pub use status::show_status;

use readmap_core::schema::Database;
use readmap_etl::{BackfillReport, Config, PipelineError};

/// Open the configured database, reporting failures as an unavailable store.
fn open_store(config: &Config) -> Result<Database, PipelineError> {
    Database::open(&config.database_path).map_err(PipelineError::StoreUnavailable)
}

/// Print the summary line shared by `seed` and `backfill`.
fn print_backfill_summary(report: &BackfillReport) {
    println!(
        "  Embedded: {}  Skipped (no description): {}  Failed: {}",
        report.embedded(),
        report.skipped(),
        report.failed()
    );

    if report.failed() > 0 {
        println!("\n  Failed books stay pending; run `readmap backfill` to retry them");
    }
}
