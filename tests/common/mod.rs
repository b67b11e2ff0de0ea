#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use bytes::Bytes;
use chrono::{Duration, Utc};
use rak::config::Config;
use rak::db::RakStorage;
use rak::router::{RakState, rak_router};
use rak::{ObjectStore, RakError};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

pub const BOUNDARY: &str = "rak-test-boundary";

/// In-memory stand-in for the Filebase gateway: the CID is a hash of the content.
#[derive(Default)]
pub struct FakeGateway {
    objects: Mutex<HashMap<String, (String, String)>>,
    withhold_cid: AtomicBool,
}

impl FakeGateway {
    pub fn withhold_cid(&self) {
        self.withhold_cid.store(true, Ordering::SeqCst);
    }

    pub fn stored_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn content_type_of(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(_, ct)| ct.clone())
    }
}

#[async_trait]
impl ObjectStore for FakeGateway {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), RakError> {
        let mut hasher = DefaultHasher::new();
        body.hash(&mut hasher);
        let cid = format!("bafy{:016x}", hasher.finish());
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (cid, content_type.to_string()));
        Ok(())
    }

    async fn object_cid(&self, key: &str) -> Result<Option<String>, RakError> {
        if self.withhold_cid.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(cid, _)| cid.clone()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub storage: RakStorage,
    pub gateway: Arc<FakeGateway>,
    pub config: Config,
    db_path: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(Config::default()).await
    }

    pub async fn spawn_with(config: Config) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX_EPOCH")
            .as_nanos();

        let mut db_path = std::env::temp_dir();
        db_path.push(format!("rak-test-{}-{}.sqlite", std::process::id(), nanos));

        let database_url = format!("sqlite:{}", db_path.display());
        let storage = RakStorage::connect(&database_url)
            .await
            .expect("failed to open test database");
        let gateway = Arc::new(FakeGateway::default());
        let state = RakState::new(storage.clone(), gateway.clone(), config.clone())
            .expect("templates compile");

        Self {
            router: rak_router(state),
            storage,
            gateway,
            config,
            db_path,
        }
    }

    /// Create a user with a live session and return the session token.
    pub async fn sign_in(&self, email: &str, name: &str) -> String {
        let user_id = self
            .storage
            .upsert_user(email, Some(name), None)
            .await
            .expect("upsert user");
        let token = format!("session-{user_id}-{}", email.replace('@', "-"));
        self.storage
            .create_session(&token, user_id, Utc::now() + Duration::hours(1))
            .await
            .expect("create session");
        token
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(req)
            .await
            .expect("request failed")
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header("cookie", session_cookie(&self.config, token));
        }
        self.send(builder.body(Body::empty()).expect("failed to build request"))
            .await
    }

    pub async fn mint(&self, token: Option<&str>, body: Vec<u8>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/mint")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(token) = token {
            builder = builder.header("cookie", session_cookie(&self.config, token));
        }
        self.send(builder.body(Body::from(body)).expect("failed to build request"))
            .await
    }

    pub async fn certificate_count(&self) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM certificates")
            .fetch_one(self.storage.pool())
            .await
            .expect("count certificates")
    }
}

pub fn session_cookie(config: &Config, token: &str) -> String {
    format!("{}={}", config.session_cookie, token)
}

/// Build a `multipart/form-data` body with an optional title and file part.
pub fn mint_form(title: Option<&str>, file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(title) = title {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\n{title}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn body_string(resp: Response<Body>) -> String {
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    String::from_utf8(body.to_vec()).expect("response body was not utf-8")
}

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&body).expect("response body was not json")
}
