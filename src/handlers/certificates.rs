use axum::{
    Json,
    extract::{Path, State},
};

use crate::error::RakError;
use crate::middleware::auth::SessionUser;
use crate::router::RakState;
use crate::types::certificate::{CertificateJson, PublicCertificateJson};

/// GET /api/certificates -> the caller's certificates, newest first.
pub async fn list_certificates(
    State(state): State<RakState>,
    SessionUser(user): SessionUser,
) -> Result<Json<Vec<CertificateJson>>, RakError> {
    let rows = state.storage.list_certificates_for_user(user.id).await?;
    Ok(Json(
        rows.into_iter()
            .map(|c| CertificateJson::new(c, &state.settings))
            .collect(),
    ))
}

/// GET /api/certificates/{cid} -> public lookup of a single certificate.
pub async fn get_certificate(
    State(state): State<RakState>,
    Path(cid): Path<String>,
) -> Result<Json<PublicCertificateJson>, RakError> {
    let owned = state
        .storage
        .find_certificate_by_cid(&cid)
        .await?
        .ok_or(RakError::NotFound)?;
    Ok(Json(PublicCertificateJson::new(owned, &state.settings)))
}
