//! Object storage seam: the S3-compatible gateway that pins uploads to IPFS.

pub mod filebase;

use crate::error::RakError;
use async_trait::async_trait;
use bytes::Bytes;

pub use filebase::FilebaseStore;

/// Minimal surface the mint flow needs from an S3-compatible gateway.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key` as a publicly readable object.
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), RakError>;

    /// Content identifier the gateway recorded in the object's metadata, if any yet.
    async fn object_cid(&self, key: &str) -> Result<Option<String>, RakError>;
}

/// Derive the bucket key for an uploaded file: `prefix` + basename with whitespace replaced.
pub fn object_key(prefix: &str, file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let sanitized: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    if sanitized.is_empty() {
        format!("{prefix}upload")
    } else {
        format!("{prefix}{sanitized}")
    }
}
