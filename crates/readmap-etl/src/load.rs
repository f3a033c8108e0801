use readmap_core::model::{BookId, BookRecord};
use readmap_core::BookStore;

use crate::error::PipelineResult;

/// Insert all records in one bulk operation.
///
/// Returns the store-assigned ids in input order. A rejected insert is
/// fatal; the store rolls the whole batch back.
pub fn bulk_load<S>(store: &S, records: &[BookRecord]) -> PipelineResult<Vec<BookId>>
where
    S: BookStore + ?Sized,
{
    if records.is_empty() {
        log::warn!("No book records to insert");
        return Ok(Vec::new());
    }

    let ids = store.insert_books(records)?;
    log::info!("Inserted {} books", ids.len());
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use readmap_core::schema::Database;
    use readmap_core::Error;

    #[test]
    fn test_bulk_load_assigns_ids_in_order() {
        let db = Database::open_in_memory().unwrap();
        let records = vec![BookRecord::new("First"), BookRecord::new("Second")];

        let ids = bulk_load(&db, &records).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(db.get_book(&ids[0]).unwrap().unwrap().record.title, "First");
        assert_eq!(db.get_book(&ids[1]).unwrap().unwrap().record.title, "Second");
    }

    #[test]
    fn test_bulk_load_empty_is_noop() {
        let db = Database::open_in_memory().unwrap();
        let ids = bulk_load(&db, &[]).unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_bulk_load_is_all_or_nothing() {
        let db = Database::open_in_memory().unwrap();
        // Make every insert after the first fail.
        db.conn()
            .execute_batch(
                "CREATE TRIGGER reject_second BEFORE INSERT ON books
                 WHEN (SELECT COUNT(*) FROM books) >= 1
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let records = vec![BookRecord::new("First"), BookRecord::new("Second")];
        let err = bulk_load(&db, &records).unwrap_err();
        assert!(matches!(
            err,
            crate::error::PipelineError::StoreUnavailable(Error::Database(_))
        ));
        assert_eq!(db.book_counts().unwrap().total, 0);
    }
}
