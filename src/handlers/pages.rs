use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::error;

use crate::error::RakError;
use crate::middleware::auth::MaybeSession;
use crate::render::{FeedPage, ViewPage};
use crate::router::RakState;

const MAX_CID_LEN: usize = 128;

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    pub cid: Option<String>,
}

/// GET / -> landing page for guests, certificate feed for signed-in users.
pub async fn home(
    State(state): State<RakState>,
    MaybeSession(user): MaybeSession,
) -> Result<Response, RakError> {
    let Some(user) = user else {
        return Ok(Html(state.pages.landing()?).into_response());
    };

    let certificates = state
        .storage
        .list_certificates_for_user(user.id)
        .await
        .inspect_err(|e| error!(user_id = user.id, error = %e, "feed query failed"));
    let page = FeedPage::new(&user, certificates, &state.settings);
    Ok(Html(state.pages.feed(&page)?).into_response())
}

/// GET /new -> mint form; guests are sent back to the landing page.
pub async fn new_certificate(
    State(state): State<RakState>,
    MaybeSession(user): MaybeSession,
) -> Result<Response, RakError> {
    if user.is_none() {
        return Ok(Redirect::to("/").into_response());
    }
    let html = state
        .pages
        .new_certificate(state.settings.upload_file_size)?;
    Ok(Html(html).into_response())
}

/// GET /view?cid=... -> public page for a single pinned image.
pub async fn view(
    State(state): State<RakState>,
    Query(query): Query<ViewQuery>,
) -> Result<Response, RakError> {
    let cid = query.cid.unwrap_or_default();
    if !is_valid_cid(&cid) {
        let html = state
            .pages
            .notice("Invalid link", "This link does not point to a certificate.")?;
        return Ok((StatusCode::BAD_REQUEST, Html(html)).into_response());
    }

    let title = state
        .storage
        .find_certificate_by_cid(&cid)
        .await?
        .map(|owned| owned.certificate.title);
    let page = ViewPage::new(&cid, title, &state.settings);
    Ok(Html(state.pages.view(&page)?).into_response())
}

/// CIDs are multibase strings; base32/base58 alphabets are alphanumeric.
pub fn is_valid_cid(cid: &str) -> bool {
    !cid.is_empty() && cid.len() <= MAX_CID_LEN && cid.chars().all(|c| c.is_ascii_alphanumeric())
}
