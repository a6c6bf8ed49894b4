//! Storage layer for studydeck

pub mod dao;
pub mod db;
pub mod error;
pub mod handle;
pub mod migrations;
pub mod models;

pub use db::{Database, NoopCallback, OpenOptions, OpenReport, StoreCallback, DATABASE_NAME};
pub use error::{StoreError, StoreResult};
pub use handle::{get_database, with_database, StoreCell};
pub use models::*;
