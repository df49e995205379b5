//! Multipart upload handler for `/api/upload`.

use super::error::ApiError;
use crate::application::intake::StoredUpload;
use crate::application::registry::RegistryService;
use crate::domain::video::VideoRecord;
use crate::ports::repository::VideoRepository;
use crate::ports::thumbnailer::Thumbnailer;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub video: VideoRecord,
}

/// Accept a multipart form with a `videoFile` field plus optional `title`
/// and `owner` fields. The file is streamed to storage as soon as its field
/// arrives; the record is only registered once the remaining fields are in.
/// A form that errors after the file was stored must not leave that file
/// behind, so failures are collected and the stored upload discarded before
/// they propagate.
pub async fn upload<R, T>(
    State(registry): State<Arc<RegistryService<R, T>>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError>
where
    R: VideoRepository + 'static,
    T: Thumbnailer + 'static,
{
    let mut stored: Option<StoredUpload> = None;
    let mut title: Option<String> = None;
    let mut owner: Option<String> = None;
    let mut failure: Option<ApiError> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                failure = Some(ApiError::bad_request(e.to_string()));
                break;
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "videoFile" => {
                if stored.is_some() {
                    continue;
                }
                let original = field.file_name().unwrap_or("upload").to_string();
                match registry.receive_upload(&original, field).await {
                    Ok(upload) => stored = Some(upload),
                    Err(e) => {
                        failure = Some(e.into());
                        break;
                    }
                }
            }
            "title" => match field.text().await {
                Ok(value) => title = Some(value),
                Err(e) => {
                    failure = Some(ApiError::bad_request(e.to_string()));
                    break;
                }
            },
            "owner" => match field.text().await {
                Ok(value) => owner = Some(value),
                Err(e) => {
                    failure = Some(ApiError::bad_request(e.to_string()));
                    break;
                }
            },
            _ => {}
        }
    }

    if let Some(err) = failure {
        if let Some(stored) = stored {
            registry.discard_upload(&stored).await;
        }
        return Err(err);
    }

    let video = registry.create(stored, owner, title).await?;
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: String::from("Video uploaded successfully!"),
            video,
        }),
    ))
}
