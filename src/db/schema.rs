//! SQL DDL for the user, session and certificate tables.

/// SQLite schema with:
/// - `users.email` UNIQUE; sessions resolve to a user through it
/// - `sessions` rows are written by the auth provider; `expires` is RFC3339
/// - `certificates.cid` UNIQUE so two concurrent mints of the same content
///   cannot both land, whatever the application-level check saw
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    name TEXT NULL,
    image TEXT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    session_token TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    expires TEXT NOT NULL -- RFC3339
);

CREATE TABLE IF NOT EXISTS certificates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    cid TEXT NOT NULL UNIQUE,
    size INTEGER NOT NULL,
    user_id INTEGER NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_certificates_user_id ON certificates(user_id);
"#;
