use bytes::Bytes;

use crate::error::RakError;
use crate::service::mint::MintRequest;

pub const MIN_TITLE_CHARS: usize = 3;

/// The `file` part of a mint form, as received.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub body: Bytes,
}

/// Raw `/api/mint` form fields before validation.
#[derive(Debug, Default)]
pub struct MintForm {
    pub title: Option<String>,
    pub file: Option<UploadedFile>,
}

impl MintForm {
    pub fn validate(self, limit_mb: usize) -> Result<MintRequest, RakError> {
        let file = self
            .file
            .ok_or_else(|| RakError::InvalidForm("Select the image".to_string()))?;
        if file.body.is_empty() {
            return Err(RakError::InvalidForm("Uploaded file is empty".to_string()));
        }
        if file.body.len() > limit_mb.saturating_mul(1024 * 1024) {
            return Err(RakError::PayloadTooLarge { limit_mb });
        }
        if !file.content_type.starts_with("image/") {
            return Err(RakError::InvalidForm(
                "File type must be an image".to_string(),
            ));
        }

        let title = self.title.unwrap_or_default().trim().to_string();
        if title.chars().count() < MIN_TITLE_CHARS {
            return Err(RakError::InvalidForm(format!(
                "Title must contain at least {MIN_TITLE_CHARS} characters"
            )));
        }

        Ok(MintRequest {
            title,
            file_name: file.file_name,
            content_type: file.content_type,
            body: file.body,
        })
    }
}
