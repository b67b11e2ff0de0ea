//! Server-side HTML for the landing page, feed, mint form and view page.

use chrono::{Datelike, Utc};
use handlebars::{Handlebars, TemplateError};
use serde::Serialize;

use crate::config::Config;
use crate::db::{DbCertificate, DbUser};
use crate::error::RakError;

const LAYOUT: &str = include_str!("../../templates/layout.hbs");
const LANDING: &str = include_str!("../../templates/landing.hbs");
const FEED: &str = include_str!("../../templates/feed.hbs");
const NEW: &str = include_str!("../../templates/new.hbs");
const VIEW: &str = include_str!("../../templates/view.hbs");
const NOTICE: &str = include_str!("../../templates/notice.hbs");

/// Compiled page templates.
pub struct Pages {
    registry: Handlebars<'static>,
}

impl Pages {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_partial("layout", LAYOUT)?;
        registry.register_template_string("landing", LANDING)?;
        registry.register_template_string("feed", FEED)?;
        registry.register_template_string("new", NEW)?;
        registry.register_template_string("view", VIEW)?;
        registry.register_template_string("notice", NOTICE)?;
        Ok(Self { registry })
    }

    pub fn landing(&self) -> Result<String, RakError> {
        let ctx = LandingPage {
            title: "Showcase Your Certificates and Achievements on IPFS",
            year: Utc::now().year(),
        };
        Ok(self.registry.render("landing", &ctx)?)
    }

    pub fn feed(&self, ctx: &FeedPage) -> Result<String, RakError> {
        Ok(self.registry.render("feed", ctx)?)
    }

    pub fn new_certificate(&self, max_size_mb: usize) -> Result<String, RakError> {
        let ctx = NewPage {
            title: "Mint new",
            max_size_mb,
        };
        Ok(self.registry.render("new", &ctx)?)
    }

    pub fn view(&self, ctx: &ViewPage) -> Result<String, RakError> {
        Ok(self.registry.render("view", ctx)?)
    }

    pub fn notice(&self, heading: &str, message: &str) -> Result<String, RakError> {
        let ctx = NoticePage {
            title: heading,
            heading,
            message,
        };
        Ok(self.registry.render("notice", &ctx)?)
    }
}

#[derive(Serialize)]
struct LandingPage {
    title: &'static str,
    year: i32,
}

#[derive(Serialize)]
struct NewPage {
    title: &'static str,
    max_size_mb: usize,
}

#[derive(Serialize)]
struct NoticePage<'a> {
    title: &'a str,
    heading: &'a str,
    message: &'a str,
}

#[derive(Debug, Serialize)]
pub struct HeaderUser {
    pub name: String,
    pub email: String,
    pub initial: String,
    pub image: Option<String>,
}

impl From<&DbUser> for HeaderUser {
    fn from(u: &DbUser) -> Self {
        Self {
            name: u.name.clone().unwrap_or_default(),
            email: u.email.clone(),
            initial: u.initial(),
            image: u.image.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CertificateCard {
    pub id: i64,
    pub short_id: String,
    pub title: String,
    pub cid: String,
    pub image_url: String,
    pub view_href: String,
    pub created: String,
}

impl CertificateCard {
    pub fn new(cert: &DbCertificate, cfg: &Config) -> Self {
        Self {
            id: cert.id,
            short_id: format!("{:05}", cert.id),
            title: cert.title.clone(),
            cid: cert.cid.clone(),
            image_url: image_url(cfg, &cert.cid),
            view_href: view_href(&cert.cid),
            created: cert.created_at.format("%b %-d, %Y").to_string(),
        }
    }
}

/// Shown instead of the feed when the query fails; the cause only goes to the log.
pub const FEED_UNAVAILABLE: &str = "We couldn't load your certificates. Please try again later.";

#[derive(Debug, Serialize)]
pub struct FeedPage {
    pub title: &'static str,
    pub user: HeaderUser,
    pub error: Option<&'static str>,
    pub certificates: Vec<CertificateCard>,
    pub show_copy_btn: bool,
}

impl FeedPage {
    pub fn new(user: &DbUser, certificates: Result<Vec<DbCertificate>, RakError>, cfg: &Config) -> Self {
        let (certificates, error) = match certificates {
            Ok(list) => (
                list.iter().map(|c| CertificateCard::new(c, cfg)).collect(),
                None,
            ),
            Err(_) => (Vec::new(), Some(FEED_UNAVAILABLE)),
        };
        Self {
            title: "Your Certificates",
            user: user.into(),
            error,
            certificates,
            show_copy_btn: cfg.show_copy_btn,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ViewPage {
    pub title: String,
    pub cid: String,
    pub image_url: String,
    pub certificate_title: Option<String>,
}

impl ViewPage {
    pub fn new(cid: &str, certificate_title: Option<String>, cfg: &Config) -> Self {
        Self {
            title: certificate_title.clone().unwrap_or_else(|| cid.to_string()),
            cid: cid.to_string(),
            image_url: image_url(cfg, cid),
            certificate_title,
        }
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Gateway URL for a CID; emitted unescaped, so the CID is percent-encoded.
pub fn image_url(cfg: &Config, cid: &str) -> String {
    cfg.gateway_link(&encode(cid))
}

pub fn view_href(cid: &str) -> String {
    format!("/view?cid={}", encode(cid))
}
