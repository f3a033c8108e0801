/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r#"
-- Books collection. List fields hold JSON arrays.
CREATE TABLE IF NOT EXISTS books (
    id TEXT PRIMARY KEY,
    isbn13 TEXT,
    isbn10 TEXT,
    title TEXT NOT NULL,
    subtitle TEXT,
    authors TEXT NOT NULL DEFAULT '[]',
    categories TEXT NOT NULL DEFAULT '[]',
    thumbnail TEXT,
    description TEXT,
    published_year INTEGER,
    average_rating REAL,
    num_pages INTEGER,
    ratings_count INTEGER,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_books_isbn13 ON books(isbn13);
CREATE INDEX IF NOT EXISTS idx_books_title ON books(title);
"#;

const MIGRATION_002: &str = r#"
-- Embedding columns stay NULL until the backfill writes them.
ALTER TABLE books ADD COLUMN embedding TEXT;
ALTER TABLE books ADD COLUMN embedding_model TEXT;
ALTER TABLE books ADD COLUMN embedded_at TEXT;

CREATE INDEX IF NOT EXISTS idx_books_missing_embedding
    ON books(created_at) WHERE embedding IS NULL;
"#;

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "books",
        sql: MIGRATION_001,
    },
    Migration {
        version: 2,
        name: "book_embeddings",
        sql: MIGRATION_002,
    },
];
