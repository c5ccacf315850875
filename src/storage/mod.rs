//! Local SQLite persistence for the category table.

mod categories;
mod schema;
mod types;

pub use schema::Database;
pub use types::{Category, CategoryUpdate, DatabaseError, DeletedCategory, NewCategory};
