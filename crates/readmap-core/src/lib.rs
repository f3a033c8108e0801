//! Core domain model for readmap.
//!
//! This crate defines the book record model, the SQLite schema, and the
//! [`BookStore`] contract the seeding and backfill jobs run against.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod model;
pub mod schema;
pub mod store;

pub use error::{Error, Result};
pub use store::BookStore;
