mod catalog;
pub mod db;
pub mod models;
mod priorities;
pub mod query;
mod tables;

pub use db::{Database, DatabaseError};
pub use query::{UrlQuery, UrlRow};
pub use tables::*;
