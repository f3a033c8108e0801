//! Record sources: where the books to seed come from.
//!
//! A source yields the full, ordered list of [`BookRecord`]s up front. Every
//! record is validated here so the loader and the backfill never see a
//! record without a title. Any failure is fatal; nothing has been inserted
//! yet at this point.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use readmap_core::model::BookRecord;

use crate::error::{PipelineError, PipelineResult};

/// Separator used inside the `authors` and `categories` CSV cells.
const LIST_SEPARATOR: char = ';';

/// Where to read book records from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSource {
    /// The built-in example list.
    Sample,
    /// A JSON array of book objects.
    Json(PathBuf),
    /// A CSV file with a header row naming the book fields.
    Csv(PathBuf),
}

impl RecordSource {
    /// Read, parse, and validate every record from this source.
    pub fn load(&self) -> PipelineResult<Vec<BookRecord>> {
        let records = match self {
            Self::Sample => sample_books(),
            Self::Json(path) => read_json(path)?,
            Self::Csv(path) => read_csv(path)?,
        };

        validate_records(&records)?;
        log::info!("Loaded {} book records from {}", records.len(), self);
        Ok(records)
    }
}

impl std::fmt::Display for RecordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sample => write!(f, "built-in sample list"),
            Self::Json(path) | Self::Csv(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One CSV row. List columns arrive as `;`-separated strings.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    isbn13: Option<String>,
    #[serde(default)]
    isbn10: Option<String>,
    title: String,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default)]
    authors: Option<String>,
    #[serde(default)]
    categories: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    published_year: Option<i32>,
    #[serde(default)]
    average_rating: Option<f64>,
    #[serde(default)]
    num_pages: Option<u32>,
    #[serde(default)]
    ratings_count: Option<u32>,
}

impl From<CsvRow> for BookRecord {
    fn from(row: CsvRow) -> Self {
        Self {
            isbn13: row.isbn13,
            isbn10: row.isbn10,
            title: row.title,
            subtitle: row.subtitle,
            authors: split_list(row.authors.as_deref()),
            categories: split_list(row.categories.as_deref()),
            thumbnail: row.thumbnail,
            description: row.description,
            published_year: row.published_year,
            average_rating: row.average_rating,
            num_pages: row.num_pages,
            ratings_count: row.ratings_count,
        }
    }
}

fn split_list(cell: Option<&str>) -> Vec<String> {
    cell.map(|value| {
        value
            .split(LIST_SEPARATOR)
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(ToString::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn source_error(path: &Path, message: impl std::fmt::Display) -> PipelineError {
    PipelineError::Source {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

fn read_json(path: &Path) -> PipelineResult<Vec<BookRecord>> {
    let file = File::open(path).map_err(|e| source_error(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| source_error(path, e))
}

fn read_csv(path: &Path) -> PipelineResult<Vec<BookRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(|e| source_error(path, e))?;

    reader
        .deserialize::<CsvRow>()
        .map(|row| row.map(BookRecord::from).map_err(|e| source_error(path, e)))
        .collect()
}

fn validate_records(records: &[BookRecord]) -> PipelineResult<()> {
    for (index, record) in records.iter().enumerate() {
        record
            .validate()
            .map_err(|e| PipelineError::InvalidRecord {
                index: index + 1,
                message: e.to_string(),
            })?;
    }
    Ok(())
}

/// The built-in example list.
pub fn sample_books() -> Vec<BookRecord> {
    let mut book = BookRecord::new("Example Book Title")
        .with_subtitle("An Example Subtitle")
        .with_isbns("9780143128540", "014312854X")
        .with_authors(["Author One", "Author Two"])
        .with_categories(["Fiction", "Adventure"])
        .with_description("This is an example book description.")
        .with_published_year(2020);
    book.thumbnail = Some("http://example.com/thumbnail.jpg".to_string());
    book.average_rating = Some(4.5);
    book.num_pages = Some(320);
    book.ratings_count = Some(1250);
    vec![book]
}
