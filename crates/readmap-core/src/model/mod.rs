pub mod book;
pub mod ids;

pub use book::{BookRecord, StoredBook};
pub use ids::BookId;
