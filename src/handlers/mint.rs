use axum::{
    Json,
    extract::{Multipart, State},
};
use tracing::info;

use crate::error::{MessageBody, RakError};
use crate::middleware::auth::SessionUser;
use crate::router::RakState;
use crate::types::mint::{MintForm, UploadedFile};

/// POST /api/mint -> pins the uploaded image and records its CID for the caller.
pub async fn mint_handler(
    State(state): State<RakState>,
    SessionUser(user): SessionUser,
    multipart: Multipart,
) -> Result<Json<MessageBody>, RakError> {
    let limit_mb = state.settings.upload_file_size;
    let form = read_mint_form(multipart, limit_mb).await?;
    let request = form.validate(limit_mb)?;

    info!(
        user_id = user.id,
        file_name = %request.file_name,
        size = request.body.len(),
        "mint requested"
    );

    let record = state.mint.mint(&user, request).await?;

    Ok(Json(MessageBody {
        message: "Minted".to_string(),
        cid: Some(record.cid),
    }))
}

async fn read_mint_form(mut multipart: Multipart, limit_mb: usize) -> Result<MintForm, RakError> {
    let mut form = MintForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RakError::from_multipart(e, limit_mb))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("title") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| RakError::from_multipart(e, limit_mb))?;
                form.title = Some(text);
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let body = field
                    .bytes()
                    .await
                    .map_err(|e| RakError::from_multipart(e, limit_mb))?;
                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    body,
                });
            }
            _ => {}
        }
    }

    Ok(form)
}
