use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::db::{DbCertificate, OwnedCertificate};
use crate::render::{image_url, view_href};

/// Feed entry returned by `GET /api/certificates`.
#[derive(Debug, Serialize)]
pub struct CertificateJson {
    pub id: i64,
    pub title: String,
    pub cid: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub view: String,
}

impl CertificateJson {
    pub fn new(c: DbCertificate, cfg: &Config) -> Self {
        Self {
            url: image_url(cfg, &c.cid),
            view: view_href(&c.cid),
            id: c.id,
            title: c.title,
            cid: c.cid,
            size: c.size,
            created_at: c.created_at,
        }
    }
}

/// Public lookup returned by `GET /api/certificates/{cid}`.
#[derive(Debug, Serialize)]
pub struct PublicCertificateJson {
    pub title: String,
    pub cid: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
    pub owner: String,
    pub url: String,
}

impl PublicCertificateJson {
    pub fn new(owned: OwnedCertificate, cfg: &Config) -> Self {
        let owner = owned.owner.display_name().to_string();
        let c = owned.certificate;
        Self {
            url: image_url(cfg, &c.cid),
            title: c.title,
            cid: c.cid,
            size: c.size,
            created_at: c.created_at,
            owner,
        }
    }
}
