// src/handlers.rs
use crate::{AppState, errors::RedesignError, models::UploadRequest};
use actix_files::NamedFile;
use actix_multipart::{Multipart, MultipartError};
use actix_web::{HttpResponse, web};
use bytes::BytesMut;
use futures_util::TryStreamExt;

const MAX_STYLE_FIELD_BYTES: usize = 256;

pub async fn index(data: web::Data<AppState>) -> Result<NamedFile, RedesignError> {
    let path = data.static_dir.join("index.html");
    NamedFile::open_async(&path)
        .await
        .map_err(|e| {
            RedesignError::Internal(format!("Failed to open {}: {}", path.display(), e))
        })
}

pub async fn list_styles(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.catalog.list_ids())
}

pub async fn redesign(
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, RedesignError> {
    let upload = read_upload(&mut payload, data.max_upload_bytes).await?;
    let result = data.service.redesign(upload).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// A body that is not multipart at all carries no image; it yields an empty
/// upload so the pipeline rejects it as `MissingImage`.
async fn read_upload(
    payload: &mut Multipart,
    limit: usize,
) -> Result<UploadRequest, RedesignError> {
    let mut upload = UploadRequest::default();

    loop {
        let mut field = match payload.try_next().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) if is_not_multipart(&err) => return Ok(UploadRequest::default()),
            Err(err) => return Err(err.into()),
        };
        let name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();

        match name.as_str() {
            "image" => {
                upload.content_type = field.content_type().map(|ct| ct.to_string());

                let mut image_data = BytesMut::new();
                while let Some(chunk) = field.try_next().await? {
                    if image_data.len() + chunk.len() > limit {
                        return Err(RedesignError::UploadTooLarge(limit));
                    }
                    image_data.extend_from_slice(&chunk);
                }
                upload.image = Some(image_data.freeze());
            }
            "style" => {
                let mut value = Vec::new();
                while let Some(chunk) = field.try_next().await? {
                    if value.len() + chunk.len() > MAX_STYLE_FIELD_BYTES {
                        return Err(RedesignError::Multipart("style field too long".to_string()));
                    }
                    value.extend_from_slice(&chunk);
                }
                let style = String::from_utf8(value).map_err(|_| {
                    RedesignError::Multipart("style is not valid UTF-8".to_string())
                })?;
                upload.style_id = Some(style);
            }
            _ => while field.try_next().await?.is_some() {},
        }
    }

    Ok(upload)
}

fn is_not_multipart(err: &MultipartError) -> bool {
    matches!(
        err,
        MultipartError::NoContentType
            | MultipartError::ParseContentType
            | MultipartError::Boundary
    )
}
