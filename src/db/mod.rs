//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: the `RakStorage` accessor used by handlers

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{DbCertificate, DbUser, InsertOutcome, NewCertificate, OwnedCertificate};
pub use schema::SQLITE_INIT;
pub use sqlite::{RakStorage, SqlitePool};

use crate::error::RakError;
use async_trait::async_trait;

/// Certificate reads and writes the mint flow depends on.
#[async_trait]
pub trait CertificateRecords: Send + Sync {
    async fn find_certificate_by_cid(&self, cid: &str) -> Result<Option<OwnedCertificate>, RakError>;

    async fn insert_certificate(&self, new: NewCertificate) -> Result<InsertOutcome, RakError>;
}
