//! Vector search for readmap.
//!
//! Ranks embedded books against a query vector by cosine similarity. The
//! index is built in memory from the store's embedded books; the collection
//! is small enough that a linear scan is the whole algorithm.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

use std::cmp::Ordering;

use readmap_core::model::StoredBook;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query embedding is empty")]
    EmptyQuery,
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// A ranked match.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub book: StoredBook,
    /// Cosine similarity in `[-1.0, 1.0]`; higher is closer.
    pub score: f32,
}

/// Embedded books ready to be ranked.
#[derive(Debug, Default)]
pub struct VectorIndex {
    books: Vec<StoredBook>,
}

impl VectorIndex {
    /// Build an index; books without an embedding are left out.
    pub fn from_books(books: impl IntoIterator<Item = StoredBook>) -> Self {
        let books: Vec<StoredBook> = books.into_iter().filter(StoredBook::has_embedding).collect();
        Self { books }
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// The `limit` books most similar to `query`, best first.
    ///
    /// Books whose embedding has a different length than the query (another
    /// model's output) are ignored.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let mut skipped = 0usize;
        let mut hits: Vec<SearchHit> = self
            .books
            .iter()
            .filter_map(|book| {
                let embedding = book.embedding.as_deref()?;
                if embedding.len() != query.len() {
                    skipped += 1;
                    return None;
                }
                Some(SearchHit {
                    book: book.clone(),
                    score: cosine_similarity(query, embedding),
                })
            })
            .collect();

        if skipped > 0 {
            log::debug!(
                "Ignored {} books with a {}-dimension mismatch",
                skipped,
                query.len()
            );
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Cosine similarity of two equal-length vectors; `0.0` if either is all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
