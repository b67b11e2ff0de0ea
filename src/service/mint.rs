use crate::db::{CertificateRecords, DbCertificate, DbUser, InsertOutcome, NewCertificate};
use crate::error::RakError;
use crate::storage::{ObjectStore, object_key};
use backon::{ExponentialBuilder, Retryable};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// A validated upload, ready to be pinned and recorded.
#[derive(Debug, Clone)]
pub struct MintRequest {
    pub title: String,
    pub file_name: String,
    pub content_type: String,
    pub body: Bytes,
}

/// Upload -> CID lookup -> duplicate check -> insert.
#[derive(Clone)]
pub struct MintService {
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn CertificateRecords>,
    key_prefix: String,
    cid_poll_attempts: usize,
}

impl MintService {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn CertificateRecords>,
        key_prefix: impl Into<String>,
        cid_poll_attempts: usize,
    ) -> Self {
        Self {
            objects,
            records,
            key_prefix: key_prefix.into(),
            cid_poll_attempts,
        }
    }

    pub async fn mint(&self, owner: &DbUser, req: MintRequest) -> Result<DbCertificate, RakError> {
        let key = object_key(&self.key_prefix, &req.file_name);
        let size = req.body.len() as i64;

        self.objects
            .put_object(&key, req.body, &req.content_type)
            .await?;

        let cid = self.fetch_cid(&key).await?;

        if let Some(existing) = self.records.find_certificate_by_cid(&cid).await? {
            info!(cid = %cid, owner_id = existing.owner.id, "duplicate mint rejected");
            return Err(RakError::AlreadyMinted {
                owner: existing.owner.display_name().to_string(),
            });
        }

        let new = NewCertificate {
            title: req.title,
            cid: cid.clone(),
            size,
            user_id: owner.id,
        };
        match self.records.insert_certificate(new).await {
            Ok(InsertOutcome::Created(record)) => {
                info!(cid = %record.cid, user_id = owner.id, key = %key, "certificate minted");
                Ok(record)
            }
            // lost a race with a concurrent mint of the same content
            Ok(InsertOutcome::DuplicateCid) => {
                match self.records.find_certificate_by_cid(&cid).await? {
                    Some(existing) => Err(RakError::AlreadyMinted {
                        owner: existing.owner.display_name().to_string(),
                    }),
                    None => Err(RakError::RecordNotCreated),
                }
            }
            Err(e) => {
                error!(cid = %cid, error = %e, "certificate insert failed");
                Err(RakError::RecordNotCreated)
            }
        }
    }

    /// Read the gateway-assigned CID, re-polling up to `cid_poll_attempts` times while absent.
    async fn fetch_cid(&self, key: &str) -> Result<String, RakError> {
        let objects = &self.objects;
        let retry_policy = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(250))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(self.cid_poll_attempts);

        (|| async move { objects.object_cid(key).await?.ok_or(RakError::MissingCid) })
            .retry(retry_policy)
            .when(|e: &RakError| matches!(e, RakError::MissingCid))
            .notify(|_err, dur: Duration| {
                warn!(key, "CID not published yet, polling again in {:?}", dur);
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{OwnedCertificate, RakStorage};
    use async_trait::async_trait;
    use chrono::Utc;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Gateway that only publishes the CID after `ready_after` metadata reads.
    struct SlowGateway {
        reads: AtomicUsize,
        ready_after: usize,
        keys: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ObjectStore for SlowGateway {
        async fn put_object(&self, key: &str, _body: Bytes, _ct: &str) -> Result<(), RakError> {
            self.keys.lock().unwrap().push(key.to_string());
            Ok(())
        }

        async fn object_cid(&self, _key: &str) -> Result<Option<String>, RakError> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
            Ok((n > self.ready_after).then(|| "bafyslow".to_string()))
        }
    }

    async fn setup(ready_after: usize, polls: usize) -> (MintService, Arc<SlowGateway>, DbUser) {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .unwrap();
        let storage = RakStorage::new(pool);
        storage.init_schema().await.unwrap();
        let id = storage
            .upsert_user("ada@example.com", Some("Ada"), None)
            .await
            .unwrap();
        let user = storage.find_user_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(user.id, id);

        let gateway = Arc::new(SlowGateway {
            reads: AtomicUsize::new(0),
            ready_after,
            keys: Mutex::new(Vec::new()),
        });
        let svc = MintService::new(gateway.clone(), Arc::new(storage), "rak_i_", polls);
        (svc, gateway, user)
    }

    fn request() -> MintRequest {
        MintRequest {
            title: "Rust Fundamentals".into(),
            file_name: "my cert.png".into(),
            content_type: "image/png".into(),
            body: Bytes::from_static(b"\x89PNG fake"),
        }
    }

    #[tokio::test]
    async fn single_read_without_polling() {
        let (svc, gateway, user) = setup(1, 0).await;
        let err = svc.mint(&user, request()).await.unwrap_err();
        assert!(matches!(err, RakError::MissingCid));
        assert_eq!(gateway.reads.load(Ordering::SeqCst), 1);
        assert_eq!(
            *gateway.keys.lock().unwrap(),
            vec!["rak_i_my_cert.png".to_string()]
        );
    }

    #[tokio::test]
    async fn polling_waits_for_the_cid() {
        let (svc, gateway, user) = setup(2, 3).await;
        let record = svc.mint(&user, request()).await.unwrap();
        assert_eq!(record.cid, "bafyslow");
        assert_eq!(record.size, 9);
        assert_eq!(gateway.reads.load(Ordering::SeqCst), 3);
    }

    /// Records whose first lookup misses, as if another mint lands in between.
    struct RacingRecords {
        winner: Option<DbUser>,
        insert_fails: bool,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl CertificateRecords for RacingRecords {
        async fn find_certificate_by_cid(
            &self,
            cid: &str,
        ) -> Result<Option<OwnedCertificate>, RakError> {
            if self.lookups.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(None);
            }
            Ok(self.winner.clone().map(|owner| OwnedCertificate {
                certificate: DbCertificate {
                    id: 7,
                    title: "Rust Fundamentals".into(),
                    cid: cid.to_string(),
                    size: 9,
                    user_id: owner.id,
                    created_at: Utc::now(),
                },
                owner,
            }))
        }

        async fn insert_certificate(&self, _new: NewCertificate) -> Result<InsertOutcome, RakError> {
            if self.insert_fails {
                Err(RakError::DatabaseError(sqlx::Error::PoolTimedOut))
            } else {
                Ok(InsertOutcome::DuplicateCid)
            }
        }
    }

    fn racing_service(
        winner: Option<DbUser>,
        insert_fails: bool,
    ) -> (MintService, Arc<RacingRecords>) {
        let gateway = Arc::new(SlowGateway {
            reads: AtomicUsize::new(0),
            ready_after: 0,
            keys: Mutex::new(Vec::new()),
        });
        let records = Arc::new(RacingRecords {
            winner,
            insert_fails,
            lookups: AtomicUsize::new(0),
        });
        let svc = MintService::new(gateway, records.clone(), "rak_i_", 0);
        (svc, records)
    }

    fn ada() -> DbUser {
        DbUser {
            id: 1,
            email: "ada@example.com".into(),
            name: Some("Ada".into()),
            image: None,
        }
    }

    #[tokio::test]
    async fn lost_insert_race_names_the_winner() {
        let bob = DbUser {
            id: 2,
            email: "bob@example.com".into(),
            name: Some("Bob".into()),
            image: None,
        };
        let (svc, records) = racing_service(Some(bob), false);
        let err = svc.mint(&ada(), request()).await.unwrap_err();
        assert!(matches!(err, RakError::AlreadyMinted { ref owner } if owner == "Bob"));
        assert_eq!(records.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn duplicate_without_a_visible_winner_is_not_created() {
        let (svc, records) = racing_service(None, false);
        let err = svc.mint(&ada(), request()).await.unwrap_err();
        assert!(matches!(err, RakError::RecordNotCreated));
        assert_eq!(records.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn insert_failure_is_not_created() {
        let (svc, records) = racing_service(None, true);
        let err = svc.mint(&ada(), request()).await.unwrap_err();
        assert!(matches!(err, RakError::RecordNotCreated));
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(records.lookups.load(Ordering::SeqCst), 1);
    }
}
