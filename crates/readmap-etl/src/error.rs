//! Error types for the seeding and backfill jobs.
//!
//! [`PipelineError`] is fatal: it aborts the whole job. [`EmbedError`] is
//! scoped to a single book: the backfill logs it and moves on.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a job.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A credential the job needs is not configured.
    #[error("missing credential: {name} is not set")]
    MissingCredential { name: &'static str },

    /// Configuration could not be loaded or is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// The record source could not be read or parsed.
    #[error("record source {}: {message}", path.display())]
    Source { path: PathBuf, message: String },

    /// A record failed validation at the source boundary.
    #[error("invalid record {index}: {message}")]
    InvalidRecord { index: usize, message: String },

    /// The store could not be opened, or rejected a collection-wide
    /// operation such as the bulk insert.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] readmap_core::Error),
}

impl PipelineError {
    /// Returns `true` for errors caused by configuration or credentials
    /// rather than data or the store.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::MissingCredential { .. } | Self::Config(_))
    }
}

/// Errors from embedding a single book.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// The embedding API answered with an error status.
    #[error("HTTP {status} from {source_name}: {message}")]
    Http {
        source_name: String,
        status: u16,
        message: String,
    },

    /// The response body could not be parsed.
    #[error("parse error from {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// The response parsed but carried no usable vector.
    #[error("{source_name} returned no embedding for model {model}")]
    EmptyResponse { source_name: String, model: String },

    /// The request never completed (connection, timeout, TLS).
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Writing the embedding back to the store failed.
    #[error("database error: {0}")]
    Database(#[from] readmap_core::Error),
}

/// Convenience alias for fatal job results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Convenience alias for per-book embedding results.
pub type EmbedResult<T> = std::result::Result<T, EmbedError>;
