//! Seeding and embedding backfill jobs for readmap.
//!
//! Reads book records from a [`RecordSource`], bulk-inserts them into a
//! [`readmap_core::BookStore`], and backfills a vector embedding for every
//! book that has a description.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod backfill;
pub mod config;
pub mod embed;
pub mod error;
pub mod load;
pub mod pipeline;
pub mod source;

pub use backfill::{backfill_embeddings, BackfillOptions, BackfillOutcome, BackfillReport};
pub use config::Config;
pub use embed::{EmbeddingProvider, GeminiClient};
pub use error::{EmbedError, EmbedResult, PipelineError, PipelineResult};
pub use load::bulk_load;
pub use pipeline::{seed, SeedReport};
pub use source::RecordSource;
