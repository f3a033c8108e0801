use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{BookId, BookRecord, StoredBook};
use crate::store::BookStore;

use super::migrations::MIGRATIONS;

const BOOK_COLUMNS: &str = "id, isbn13, isbn10, title, subtitle, authors, categories,
    thumbnail, description, published_year, average_rating, num_pages,
    ratings_count, embedding, embedding_model, embedded_at, created_at";

/// A database connection holding the book collection.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

/// Collection-wide counts, as shown by `readmap status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BookCounts {
    pub total: u64,
    pub embedded: u64,
    /// Books without an embedding that have a description to embed.
    pub pending: u64,
    /// Books without an embedding and without a description; the backfill
    /// skips these on every run.
    pub no_description: u64,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                self.conn.execute_batch(migration.sql)?;
                self.conn.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    rusqlite::params![migration.version, migration.name],
                )?;
            }
        }

        Ok(())
    }
}

// Book queries
impl Database {
    /// Fetch a single book by id.
    pub fn get_book(&self, id: &BookId) -> Result<Option<StoredBook>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1");
        let raw = self
            .conn
            .query_row(&sql, [id.to_string()], BookRow::from_row)
            .optional()?;
        raw.map(BookRow::into_stored).transpose()
    }

    /// List every book that already carries an embedding.
    pub fn list_embedded_books(&self) -> Result<Vec<StoredBook>> {
        self.query_books("WHERE embedding IS NOT NULL ORDER BY rowid")
    }

    /// Count books by embedding state.
    pub fn book_counts(&self) -> Result<BookCounts> {
        let (total, embedded, no_description): (i64, i64, i64) = self.conn.query_row(
            "SELECT COUNT(*),
                    COUNT(embedding),
                    COALESCE(SUM(CASE
                        WHEN embedding IS NULL AND (description IS NULL OR description = '')
                        THEN 1 ELSE 0 END), 0)
             FROM books",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let total = total.unsigned_abs();
        let embedded = embedded.unsigned_abs();
        let no_description = no_description.unsigned_abs();
        Ok(BookCounts {
            total,
            embedded,
            pending: total - embedded - no_description,
            no_description,
        })
    }

    fn query_books(&self, clause: &str) -> Result<Vec<StoredBook>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books {clause}");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], BookRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(BookRow::into_stored).collect()
    }
}

impl BookStore for Database {
    fn insert_books(&self, books: &[BookRecord]) -> Result<Vec<BookId>> {
        let tx = self.conn.unchecked_transaction()?;
        let created_at = Utc::now().to_rfc3339();
        let mut ids = Vec::with_capacity(books.len());

        {
            let mut stmt = tx.prepare(
                "INSERT INTO books (
                    id, isbn13, isbn10, title, subtitle, authors, categories,
                    thumbnail, description, published_year, average_rating,
                    num_pages, ratings_count, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )?;

            for book in books {
                let id = BookId::new();
                stmt.execute(rusqlite::params![
                    id.to_string(),
                    book.isbn13,
                    book.isbn10,
                    book.title,
                    book.subtitle,
                    serde_json::to_string(&book.authors)?,
                    serde_json::to_string(&book.categories)?,
                    book.thumbnail,
                    book.description,
                    book.published_year,
                    book.average_rating,
                    book.num_pages.map(i64::from),
                    book.ratings_count.map(i64::from),
                    created_at,
                ])?;
                ids.push(id);
            }
        }

        tx.commit()?;
        Ok(ids)
    }

    fn books_missing_embedding(&self) -> Result<Vec<StoredBook>> {
        // Matches idx_books_missing_embedding; rowid breaks ties within a batch.
        self.query_books("WHERE embedding IS NULL ORDER BY created_at, rowid")
    }

    fn set_embedding(&self, id: &BookId, embedding: &[f32], model: &str) -> Result<()> {
        if embedding.is_empty() {
            return Err(Error::InvalidData(format!(
                "refusing to store an empty embedding for book {id}"
            )));
        }

        let changed = self.conn.execute(
            "UPDATE books SET embedding = ?2, embedding_model = ?3, embedded_at = ?4
             WHERE id = ?1 AND embedding IS NULL",
            rusqlite::params![
                id.to_string(),
                serde_json::to_string(embedding)?,
                model,
                Utc::now().to_rfc3339(),
            ],
        )?;

        if changed == 1 {
            return Ok(());
        }

        let already_embedded: Option<bool> = self
            .conn
            .query_row(
                "SELECT embedding IS NOT NULL FROM books WHERE id = ?1",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match already_embedded {
            Some(true) => Err(Error::EmbeddingAlreadySet { id: id.to_string() }),
            _ => Err(Error::NotFound {
                entity: "book",
                id: id.to_string(),
            }),
        }
    }
}

/// Raw column values of a `books` row, decoded into the model afterwards so
/// corrupt data surfaces as [`Error::Corrupt`] instead of a panic.
struct BookRow {
    id: String,
    isbn13: Option<String>,
    isbn10: Option<String>,
    title: String,
    subtitle: Option<String>,
    authors: String,
    categories: String,
    thumbnail: Option<String>,
    description: Option<String>,
    published_year: Option<i32>,
    average_rating: Option<f64>,
    num_pages: Option<i64>,
    ratings_count: Option<i64>,
    embedding: Option<String>,
    embedding_model: Option<String>,
    embedded_at: Option<String>,
    created_at: String,
}

impl BookRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            isbn13: row.get(1)?,
            isbn10: row.get(2)?,
            title: row.get(3)?,
            subtitle: row.get(4)?,
            authors: row.get(5)?,
            categories: row.get(6)?,
            thumbnail: row.get(7)?,
            description: row.get(8)?,
            published_year: row.get(9)?,
            average_rating: row.get(10)?,
            num_pages: row.get(11)?,
            ratings_count: row.get(12)?,
            embedding: row.get(13)?,
            embedding_model: row.get(14)?,
            embedded_at: row.get(15)?,
            created_at: row.get(16)?,
        })
    }

    fn into_stored(self) -> Result<StoredBook> {
        let id: BookId = self.id.parse().map_err(|e: uuid::Error| Error::Corrupt {
            column: "id",
            id: self.id.clone(),
            message: e.to_string(),
        })?;
        let row_id = self.id;

        let corrupt = |column: &'static str, message: String| Error::Corrupt {
            column,
            id: row_id.clone(),
            message,
        };

        let authors: Vec<String> =
            serde_json::from_str(&self.authors).map_err(|e| corrupt("authors", e.to_string()))?;
        let categories: Vec<String> = serde_json::from_str(&self.categories)
            .map_err(|e| corrupt("categories", e.to_string()))?;
        let embedding: Option<Vec<f32>> = self
            .embedding
            .as_deref()
            .map(|raw| serde_json::from_str(raw))
            .transpose()
            .map_err(|e| corrupt("embedding", e.to_string()))?;
        let embedded_at = self
            .embedded_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .map_err(|e| corrupt("embedded_at", e))?;
        let created_at =
            parse_timestamp(&self.created_at).map_err(|e| corrupt("created_at", e))?;

        Ok(StoredBook {
            id,
            record: BookRecord {
                isbn13: self.isbn13,
                isbn10: self.isbn10,
                title: self.title,
                subtitle: self.subtitle,
                authors,
                categories,
                thumbnail: self.thumbnail,
                description: self.description,
                published_year: self.published_year,
                average_rating: self.average_rating,
                num_pages: self.num_pages.and_then(|v| u32::try_from(v).ok()),
                ratings_count: self.ratings_count.and_then(|v| u32::try_from(v).ok()),
            },
            embedding,
            embedding_model: self.embedding_model,
            embedded_at,
            created_at,
        })
    }
}

fn parse_timestamp(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(Into::into)
        .map_err(|e| e.to_string())
}
