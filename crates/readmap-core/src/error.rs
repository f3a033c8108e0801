use thiserror::Error;

/// Errors raised by the book store and the domain model.
#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// The targeted update found the book already embedded; embeddings are
    /// written at most once.
    #[error("book {id} already has an embedding")]
    EmbeddingAlreadySet { id: String },

    /// A stored column could not be decoded back into the model.
    #[error("corrupt {column} column for book {id}: {message}")]
    Corrupt {
        column: &'static str,
        id: String,
        message: String,
    },

    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, Error>;
