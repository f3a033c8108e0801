//! SQLite persistence for the book collection.

pub mod db;
pub mod migrations;

pub use db::{BookCounts, Database};
