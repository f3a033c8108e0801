//! The document store contract used by the seeding and backfill jobs.

use crate::error::Result;
use crate::model::{BookId, BookRecord, StoredBook};

/// The three capabilities the jobs need from a book collection.
///
/// [`crate::schema::Database`] is the SQLite implementation; tests may
/// substitute their own.
pub trait BookStore {
    /// Insert every record in one all-or-nothing operation, returning the
    /// assigned identities in input order.
    fn insert_books(&self, books: &[BookRecord]) -> Result<Vec<BookId>>;

    /// All books whose embedding is absent.
    fn books_missing_embedding(&self) -> Result<Vec<StoredBook>>;

    /// Write the embedding of a single book.
    ///
    /// Only succeeds while the book has no embedding; an existing embedding
    /// is never overwritten.
    fn set_embedding(&self, id: &BookId, embedding: &[f32], model: &str) -> Result<()>;
}
