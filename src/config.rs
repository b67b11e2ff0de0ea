use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

/// Runtime configuration, layered as defaults <- `RAK_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub loglevel: String,
    pub database_url: String,

    pub s3_endpoint: Url,
    pub s3_region: String,
    pub s3_bucket: String,
    pub s3_key: String,
    pub s3_secret: String,

    /// Public IPFS gateway; images are served from `<gateway_url>/<cid>`.
    pub gateway_url: Url,
    pub object_key_prefix: String,
    pub session_cookie: String,

    /// Upload limit in megabytes.
    pub upload_file_size: usize,
    pub show_copy_btn: bool,
    /// Extra metadata reads when the gateway has not published a CID yet. 0 = single read.
    pub cid_poll_attempts: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            database_url: "sqlite://data.sqlite".to_string(),
            s3_endpoint: Url::parse("https://s3.filebase.com").expect("static url"),
            s3_region: "us-east-1".to_string(),
            s3_bucket: "share-house".to_string(),
            s3_key: String::new(),
            s3_secret: String::new(),
            gateway_url: Url::parse("https://tight-azure-chicken.myfilebase.com/ipfs")
                .expect("static url"),
            object_key_prefix: "rak_i_".to_string(),
            session_cookie: "authjs.session-token".to_string(),
            upload_file_size: 5,
            show_copy_btn: true,
            cid_poll_attempts: 0,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("RAK_"))
            .extract()
    }

    /// Upload limit in bytes.
    pub fn upload_limit_bytes(&self) -> usize {
        self.upload_file_size.saturating_mul(1024 * 1024)
    }

    /// Public URL of a pinned object.
    pub fn gateway_link(&self, cid: &str) -> String {
        format!("{}/{}", self.gateway_url.as_str().trim_end_matches('/'), cid)
    }
}

pub static CONFIG: LazyLock<Config> =
    LazyLock::new(|| Config::load().expect("FATAL: invalid RAK_* configuration"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_link_joins_without_double_slash() {
        let mut cfg = Config::default();
        cfg.gateway_url = Url::parse("https://ipfs.io/ipfs/").unwrap();
        assert_eq!(cfg.gateway_link("bafyabc"), "https://ipfs.io/ipfs/bafyabc");
    }

    #[test]
    fn upload_limit_is_megabytes() {
        let cfg = Config::default();
        assert_eq!(cfg.upload_limit_bytes(), 5 * 1024 * 1024);
    }
}
