use crate::config::Config;
use crate::error::RakError;
use crate::storage::ObjectStore;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use bytes::Bytes;
use tracing::debug;

/// Metadata key under which Filebase publishes the IPFS CID.
const CID_METADATA_KEY: &str = "cid";

/// S3 client bound to one bucket on a Filebase-style gateway.
#[derive(Clone)]
pub struct FilebaseStore {
    client: Client,
    bucket: String,
}

impl FilebaseStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a path-style client from static credentials.
    pub fn from_config(cfg: &Config) -> Self {
        let credentials = Credentials::new(
            cfg.s3_key.clone(),
            cfg.s3_secret.clone(),
            None,
            None,
            "rak-config",
        );
        let conf = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(cfg.s3_region.clone()))
            .endpoint_url(cfg.s3_endpoint.as_str().trim_end_matches('/'))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();
        Self::new(Client::from_conf(conf), cfg.s3_bucket.clone())
    }
}

#[async_trait]
impl ObjectStore for FilebaseStore {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), RakError> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| RakError::ObjectStorage(DisplayErrorContext(e).to_string()))?;
        debug!(bucket = %self.bucket, key, size, "object stored");
        Ok(())
    }

    async fn object_cid(&self, key: &str) -> Result<Option<String>, RakError> {
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| RakError::ObjectStorage(DisplayErrorContext(e).to_string()))?;
        Ok(head
            .metadata()
            .and_then(|m| m.get(CID_METADATA_KEY))
            .filter(|cid| !cid.is_empty())
            .cloned())
    }
}
