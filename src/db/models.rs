use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

impl DbUser {
    /// Name shown to other users; never falls back to the email address.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("another user")
    }

    pub fn initial(&self) -> String {
        self.name
            .as_deref()
            .and_then(|n| n.chars().next())
            .or_else(|| self.email.chars().next())
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbCertificate {
    pub id: i64,
    pub title: String,
    pub cid: String,
    pub size: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A certificate joined with the user who minted it.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedCertificate {
    pub certificate: DbCertificate,
    pub owner: DbUser,
}

#[derive(Debug, Clone)]
pub struct NewCertificate {
    pub title: String,
    pub cid: String,
    pub size: i64,
    pub user_id: i64,
}

#[derive(Debug)]
pub enum InsertOutcome {
    Created(DbCertificate),
    /// The unique index on `cid` rejected the row.
    DuplicateCid,
}
