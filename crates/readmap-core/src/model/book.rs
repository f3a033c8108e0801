use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::ids::BookId;

/// The descriptive fields of a book, as supplied by a record source.
///
/// Field names match the columns of the tabular input and the keys of the
/// JSON list form one-to-one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BookRecord {
    /// 13-digit ISBN, kept as a string so leading zeros survive.
    #[serde(default)]
    pub isbn13: Option<String>,

    /// 10-digit ISBN (may end in `X`).
    #[serde(default)]
    pub isbn10: Option<String>,

    pub title: String,

    #[serde(default)]
    pub subtitle: Option<String>,

    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default)]
    pub categories: Vec<String>,

    /// Cover image URL.
    #[serde(default)]
    pub thumbnail: Option<String>,

    /// Free-text description; the input to the embedding model.
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub published_year: Option<i32>,

    #[serde(default)]
    pub average_rating: Option<f64>,

    #[serde(default)]
    pub num_pages: Option<u32>,

    #[serde(default)]
    pub ratings_count: Option<u32>,
}

impl BookRecord {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    #[must_use]
    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_isbns(mut self, isbn13: impl Into<String>, isbn10: impl Into<String>) -> Self {
        self.isbn13 = Some(isbn13.into());
        self.isbn10 = Some(isbn10.into());
        self
    }

    #[must_use]
    pub fn with_published_year(mut self, year: i32) -> Self {
        self.published_year = Some(year);
        self
    }

    /// The text to embed, or `None` when the description is absent or empty.
    ///
    /// Books without embeddable text are skipped by the backfill and never
    /// acquire an embedding.
    pub fn embeddable_text(&self) -> Option<&str> {
        self.description.as_deref().filter(|text| !text.is_empty())
    }

    /// Check the fields every record must carry.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidData("book record has an empty title".to_string()));
        }
        if let Some(rating) = self.average_rating {
            if !rating.is_finite() {
                return Err(Error::InvalidData(format!(
                    "book record '{}' has a non-finite average_rating",
                    self.title
                )));
            }
        }
        Ok(())
    }
}

/// A book as persisted in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBook {
    pub id: BookId,
    pub record: BookRecord,

    /// Present only after a successful backfill.
    pub embedding: Option<Vec<f32>>,

    /// Model that produced `embedding`.
    pub embedding_model: Option<String>,

    pub embedded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl StoredBook {
    #[must_use]
    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_record_new() {
        let book = BookRecord::new("Clean Code");
        assert_eq!(book.title, "Clean Code");
        assert!(book.authors.is_empty());
        assert!(book.description.is_none());
    }

    #[test]
    fn test_book_record_builder() {
        let book = BookRecord::new("Refactoring")
            .with_subtitle("Improving the Design of Existing Code")
            .with_authors(["Martin Fowler"])
            .with_categories(["Programming"])
            .with_isbns("9780134757599", "0134757599")
            .with_published_year(2018);

        assert_eq!(book.authors, vec!["Martin Fowler".to_string()]);
        assert_eq!(book.isbn10.as_deref(), Some("0134757599"));
        assert_eq!(book.published_year, Some(2018));
    }

    #[test]
    fn test_embeddable_text() {
        let book = BookRecord::new("A").with_description("A mystery novel.");
        assert_eq!(book.embeddable_text(), Some("A mystery novel."));

        let empty = BookRecord::new("B").with_description("");
        assert_eq!(empty.embeddable_text(), None);

        let missing = BookRecord::new("C");
        assert_eq!(missing.embeddable_text(), None);
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        assert!(BookRecord::new("   ").validate().is_err());
        assert!(BookRecord::new("Dune").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_nan_rating() {
        let mut book = BookRecord::new("Dune");
        book.average_rating = Some(f64::NAN);
        assert!(book.validate().is_err());
    }

    #[test]
    fn test_deserialize_defaults_missing_fields() {
        let book: BookRecord = serde_json::from_str(r#"{"title": "Dune"}"#).unwrap();
        assert_eq!(book.title, "Dune");
        assert!(book.categories.is_empty());
        assert!(book.isbn13.is_none());
    }
}
