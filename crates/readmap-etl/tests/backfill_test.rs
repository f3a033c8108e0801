//! End-to-end tests for the seeding and backfill jobs.
//!
//! The store is a real SQLite database (in memory or in a temp dir); the
//! embedding API is replaced by a scripted provider that records every call.

use std::collections::HashSet;
use std::fs;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use readmap_core::model::{BookId, BookRecord, StoredBook};
use readmap_core::schema::Database;
use readmap_core::{BookStore, Error as StoreError};
use readmap_etl::{
    backfill_embeddings, seed, BackfillOptions, BackfillOutcome, EmbedError, EmbedResult,
    EmbeddingProvider, GeminiClient, PipelineError, RecordSource,
};

/// Embeds text as `[len, 1.0]` and fails for any text in `failing`.
#[derive(Debug, Default)]
struct ScriptedProvider {
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn failing_on(texts: &[&str]) -> Self {
        Self {
            failing: texts.iter().map(|t| (*t).to_string()).collect(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedProvider {
    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn embed(&self, text: &str) -> EmbedResult<Vec<Vec<f32>>> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.failing.contains(text) {
            return Err(EmbedError::Http {
                source_name: "scripted".to_string(),
                status: 503,
                message: "simulated outage".to_string(),
            });
        }
        Ok(vec![vec![text.len() as f32, 1.0]])
    }
}

/// A database whose embedding write fails for one chosen book.
#[derive(Debug)]
struct RejectingStore {
    db: Database,
    reject: BookId,
}

impl BookStore for RejectingStore {
    fn insert_books(&self, books: &[BookRecord]) -> readmap_core::Result<Vec<BookId>> {
        self.db.insert_books(books)
    }

    fn books_missing_embedding(&self) -> readmap_core::Result<Vec<StoredBook>> {
        self.db.books_missing_embedding()
    }

    fn set_embedding(&self, id: &BookId, embedding: &[f32], model: &str) -> readmap_core::Result<()> {
        if *id == self.reject {
            return Err(StoreError::InvalidData("disk full".to_string()));
        }
        self.db.set_embedding(id, embedding, model)
    }
}

/// D1 has a description, D2 an empty one, D3 none at all.
fn three_books() -> Vec<BookRecord> {
    vec![
        BookRecord::new("D1").with_description("A mystery novel."),
        BookRecord::new("D2").with_description(""),
        BookRecord::new("D3"),
    ]
}

fn seeded_store() -> (Database, Vec<BookId>) {
    let db = Database::open_in_memory().unwrap();
    let ids = db.insert_books(&three_books()).unwrap();
    (db, ids)
}

fn embedding_of(db: &Database, id: &BookId) -> Option<Vec<f32>> {
    db.get_book(id).unwrap().unwrap().embedding
}

#[tokio::test]
async fn test_only_books_with_descriptions_are_embedded() {
    let (db, ids) = seeded_store();
    let provider = ScriptedProvider::default();

    let report = backfill_embeddings(&db, &provider, BackfillOptions::default())
        .await
        .unwrap();

    assert_eq!(provider.calls(), vec!["A mystery novel.".to_string()]);
    assert_eq!(report.embedded(), 1);
    assert_eq!(report.skipped(), 2);
    assert_eq!(report.failed(), 0);

    let d1 = embedding_of(&db, &ids[0]).unwrap();
    assert!(!d1.is_empty());
    assert!(embedding_of(&db, &ids[1]).is_none());
    assert!(embedding_of(&db, &ids[2]).is_none());
}

#[tokio::test]
async fn test_rerun_makes_no_calls_and_changes_nothing() {
    let (db, ids) = seeded_store();

    let first = ScriptedProvider::default();
    backfill_embeddings(&db, &first, BackfillOptions::default())
        .await
        .unwrap();
    let after_first: Vec<_> = ids.iter().map(|id| db.get_book(id).unwrap()).collect();

    let second = ScriptedProvider::default();
    let report = backfill_embeddings(&db, &second, BackfillOptions::default())
        .await
        .unwrap();
    let after_second: Vec<_> = ids.iter().map(|id| db.get_book(id).unwrap()).collect();

    assert!(second.calls().is_empty());
    assert_eq!(report.embedded(), 0);
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn test_skipped_books_never_gain_an_embedding() {
    let (db, ids) = seeded_store();
    let provider = ScriptedProvider::default();

    for _ in 0..3 {
        backfill_embeddings(&db, &provider, BackfillOptions::default())
            .await
            .unwrap();
    }

    assert!(embedding_of(&db, &ids[1]).is_none());
    assert!(embedding_of(&db, &ids[2]).is_none());
    assert_eq!(provider.calls().len(), 1);
}

#[tokio::test]
async fn test_failure_leaves_book_pending_and_does_not_abort() {
    let (db, ids) = seeded_store();
    let provider = ScriptedProvider::failing_on(&["A mystery novel."]);

    let report = backfill_embeddings(&db, &provider, BackfillOptions::default())
        .await
        .unwrap();

    assert_eq!(report.failed(), 1);
    let failed = report
        .outcomes
        .iter()
        .find(|o| matches!(o, BackfillOutcome::Failed { .. }))
        .unwrap();
    assert_eq!(failed.id(), ids[0]);
    assert!(embedding_of(&db, &ids[0]).is_none());

    // The failed book is retried on the next run.
    let retry = ScriptedProvider::default();
    backfill_embeddings(&db, &retry, BackfillOptions::default())
        .await
        .unwrap();
    assert_eq!(retry.calls(), vec!["A mystery novel.".to_string()]);
    assert!(embedding_of(&db, &ids[0]).is_some());
}

#[tokio::test]
async fn test_failure_is_isolated_from_later_books() {
    let db = Database::open_in_memory().unwrap();
    let ids = db
        .insert_books(&[
            BookRecord::new("A").with_description("fails"),
            BookRecord::new("B").with_description("works"),
        ])
        .unwrap();
    let provider = ScriptedProvider::failing_on(&["fails"]);

    let report = backfill_embeddings(&db, &provider, BackfillOptions::default())
        .await
        .unwrap();

    assert_eq!(provider.calls(), vec!["fails".to_string(), "works".to_string()]);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.embedded(), 1);
    assert!(embedding_of(&db, &ids[0]).is_none());
    assert_eq!(embedding_of(&db, &ids[1]), Some(vec![5.0, 1.0]));
}

#[tokio::test]
async fn test_failed_write_is_isolated_from_later_books() {
    let db = Database::open_in_memory().unwrap();
    let ids = db
        .insert_books(&[
            BookRecord::new("A").with_description("first"),
            BookRecord::new("B").with_description("second"),
        ])
        .unwrap();
    let store = RejectingStore { db, reject: ids[0] };
    let provider = ScriptedProvider::default();

    let report = backfill_embeddings(&store, &provider, BackfillOptions::default())
        .await
        .unwrap();

    assert_eq!(provider.calls().len(), 2);
    assert!(matches!(
        &report.outcomes[0],
        BackfillOutcome::Failed {
            error: EmbedError::Database(_),
            ..
        }
    ));
    assert_eq!(report.outcomes[0].id(), ids[0]);
    assert_eq!(report.embedded(), 1);
    assert!(embedding_of(&store.db, &ids[0]).is_none());
    assert_eq!(embedding_of(&store.db, &ids[1]), Some(vec![6.0, 1.0]));
}

#[tokio::test]
async fn test_calls_happen_iff_missing_embedding_and_description() {
    let db = Database::open_in_memory().unwrap();
    let ids = db
        .insert_books(&[
            BookRecord::new("Embedded already").with_description("old"),
            BookRecord::new("Needs one").with_description("new"),
            BookRecord::new("Blank").with_description(""),
        ])
        .unwrap();
    db.set_embedding(&ids[0], &[9.0], "earlier-model").unwrap();

    let provider = ScriptedProvider::default();
    backfill_embeddings(&db, &provider, BackfillOptions::default())
        .await
        .unwrap();

    assert_eq!(provider.calls(), vec!["new".to_string()]);
    let untouched = db.get_book(&ids[0]).unwrap().unwrap();
    assert_eq!(untouched.embedding, Some(vec![9.0]));
    assert_eq!(untouched.embedding_model.as_deref(), Some("earlier-model"));
}

#[tokio::test]
async fn test_seed_from_json_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("books.json");
    fs::write(
        &input,
        r#"[
            {"title": "D1", "description": "A mystery novel."},
            {"title": "D2", "description": ""},
            {"title": "D3"}
        ]"#,
    )
    .unwrap();
    let db = Database::open(dir.path().join("readmap.db")).unwrap();
    let provider = ScriptedProvider::default();

    let report = seed(
        &db,
        &RecordSource::Json(input),
        Some(&provider),
        BackfillOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.inserted.len(), 3);
    let backfill = report.backfill.unwrap();
    assert_eq!(backfill.embedded(), 1);
    assert_eq!(provider.calls().len(), 1);
    assert_eq!(db.book_counts().unwrap().embedded, 1);
}

#[tokio::test]
async fn test_seed_without_backfill() {
    let db = Database::open_in_memory().unwrap();

    let report = seed::<_, ScriptedProvider>(
        &db,
        &RecordSource::Sample,
        None,
        BackfillOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.inserted.len(), 1);
    assert!(report.backfill.is_none());
    assert_eq!(db.books_missing_embedding().unwrap().len(), 1);
}

#[tokio::test]
async fn test_seed_with_missing_source_inserts_nothing() {
    let db = Database::open_in_memory().unwrap();
    let provider = ScriptedProvider::default();

    let err = seed(
        &db,
        &RecordSource::Csv("/nonexistent/books.csv".into()),
        Some(&provider),
        BackfillOptions::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PipelineError::Source { .. }));
    assert_eq!(db.book_counts().unwrap().total, 0);
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_backfill_through_http_client() {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-embedding-exp-03-07:embedContent"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embedding": {"values": [0.1, 0.2]}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (db, ids) = seeded_store();
    let client = GeminiClient::with_options(
        "test-key",
        "gemini-embedding-exp-03-07",
        server.uri(),
        std::time::Duration::from_secs(5),
    )
    .unwrap();

    let report = backfill_embeddings(&db, &client, BackfillOptions::default())
        .await
        .unwrap();

    assert_eq!(report.embedded(), 1);
    assert_eq!(embedding_of(&db, &ids[0]), Some(vec![0.1, 0.2]));
}
