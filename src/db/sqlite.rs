use crate::db::CertificateRecords;
use crate::db::models::{DbCertificate, DbUser, InsertOutcome, NewCertificate, OwnedCertificate};
use crate::db::schema::SQLITE_INIT;
use crate::error::RakError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use tracing::debug;

pub type SqlitePool = Pool<Sqlite>;

#[derive(Clone)]
pub struct RakStorage {
    pool: SqlitePool,
}

impl RakStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `database_url` and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, RakError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), RakError> {
        // sqlx::query runs a single statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Upsert by unique email. Returns the row id.
    pub async fn upsert_user(
        &self,
        email: &str,
        name: Option<&str>,
        image: Option<&str>,
    ) -> Result<i64, RakError> {
        sqlx::query(
            r#"
            INSERT INTO users (email, name, image) VALUES (?, ?, ?)
            ON CONFLICT(email) DO UPDATE SET
                name=excluded.name,
                image=excluded.image
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(image)
        .execute(&self.pool)
        .await?;

        let rec: (i64,) = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(rec.0)
    }

    pub async fn create_session(
        &self,
        session_token: &str,
        user_id: i64,
        expires: DateTime<Utc>,
    ) -> Result<(), RakError> {
        sqlx::query("INSERT INTO sessions (session_token, user_id, expires) VALUES (?, ?, ?)")
            .bind(session_token)
            .bind(user_id)
            .bind(expires.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Email of the user behind an unexpired session token.
    pub async fn find_session_email(&self, session_token: &str) -> Result<Option<String>, RakError> {
        let row = sqlx::query(
            r#"SELECT u.email AS email, s.expires AS expires
               FROM sessions s JOIN users u ON u.id = s.user_id
               WHERE s.session_token = ?"#,
        )
        .bind(session_token)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let email: String = row.try_get("email")?;
        let expires = parse_rfc3339(row.try_get("expires")?)?;
        if expires <= Utc::now() {
            debug!("session expired at {}", expires);
            return Ok(None);
        }
        Ok(Some(email))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<DbUser>, RakError> {
        let user = sqlx::query_as::<_, DbUser>(
            "SELECT id, email, name, image FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_certificate_by_cid(
        &self,
        cid: &str,
    ) -> Result<Option<OwnedCertificate>, RakError> {
        let row = sqlx::query(
            r#"SELECT c.id, c.title, c.cid, c.size, c.user_id, c.created_at,
                      u.email AS owner_email, u.name AS owner_name, u.image AS owner_image
               FROM certificates c JOIN users u ON u.id = c.user_id
               WHERE c.cid = ?"#,
        )
        .bind(cid)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_owned).transpose()
    }

    /// Newest first.
    pub async fn list_certificates_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<DbCertificate>, RakError> {
        let rows = sqlx::query(
            r#"SELECT id, title, cid, size, user_id, created_at
               FROM certificates WHERE user_id = ? ORDER BY id DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_certificate).collect()
    }

    pub async fn insert_certificate(&self, new: NewCertificate) -> Result<InsertOutcome, RakError> {
        let created_at = Utc::now();
        let res = sqlx::query(
            r#"INSERT INTO certificates (title, cid, size, user_id, created_at)
               VALUES (?, ?, ?, ?, ?)
               RETURNING id"#,
        )
        .bind(&new.title)
        .bind(&new.cid)
        .bind(new.size)
        .bind(new.user_id)
        .bind(created_at.to_rfc3339())
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(row) => Ok(InsertOutcome::Created(DbCertificate {
                id: row.try_get("id")?,
                title: new.title,
                cid: new.cid,
                size: new.size,
                user_id: new.user_id,
                created_at,
            })),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Ok(InsertOutcome::DuplicateCid)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn row_to_certificate(row: SqliteRow) -> Result<DbCertificate, RakError> {
        Ok(DbCertificate {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            cid: row.try_get("cid")?,
            size: row.try_get("size")?,
            user_id: row.try_get("user_id")?,
            created_at: parse_rfc3339(row.try_get("created_at")?)?,
        })
    }

    fn row_to_owned(row: SqliteRow) -> Result<OwnedCertificate, RakError> {
        let owner = DbUser {
            id: row.try_get("user_id")?,
            email: row.try_get("owner_email")?,
            name: row.try_get("owner_name")?,
            image: row.try_get("owner_image")?,
        };
        let certificate = Self::row_to_certificate(row)?;
        Ok(OwnedCertificate { certificate, owner })
    }
}

#[async_trait]
impl CertificateRecords for RakStorage {
    async fn find_certificate_by_cid(&self, cid: &str) -> Result<Option<OwnedCertificate>, RakError> {
        RakStorage::find_certificate_by_cid(self, cid).await
    }

    async fn insert_certificate(&self, new: NewCertificate) -> Result<InsertOutcome, RakError> {
        RakStorage::insert_certificate(self, new).await
    }
}

fn parse_rfc3339(s: String) -> Result<DateTime<Utc>, RakError> {
    let dt = DateTime::parse_from_rfc3339(&s)
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
        .with_timezone(&Utc);
    Ok(dt)
}
