//! HTTP handler for `POST /api/upload`.
//! Reads the single `file` field and delegates persistence to whichever
//! backend `StorageService` was built with.

use crate::{
    errors::AppError,
    models::asset::UploadResponse,
    services::storage_service::StorageService,
};
use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::MultipartRejection,
    },
    http::{HeaderMap, header},
};
use bytes::Bytes;

const FILE_FIELD: &str = "file";
const DEFAULT_FILENAME: &str = "upload";

/// Upload one file from the multipart field `file`.
///
/// Responds `{filename, url}`. A request without that field, where `file` is
/// a text part, or that is not multipart at all, gets
/// `400 {"error":"No file"}`; other fields are ignored.
pub async fn upload_file(
    State(service): State<StorageService>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart?;

    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart.next_field().await? {
        if upload.is_some() || field.name() != Some(FILE_FIELD) {
            continue;
        }
        // a `file` part without `filename=` is a plain text field, not a file
        let Some(filename) = field.file_name() else {
            continue;
        };
        let filename = match filename.trim() {
            "" => DEFAULT_FILENAME.to_string(),
            name => name.to_string(),
        };
        let payload = field.bytes().await?;
        upload = Some((filename, payload));
    }

    let Some((filename, payload)) = upload else {
        return Err(AppError::bad_request("No file"));
    };

    let origin = request_origin(&headers);
    let asset = service.store(&payload, &filename, &origin).await?;
    Ok(Json(asset.into()))
}

/// `scheme://host` the client used, honouring reverse-proxy headers.
pub fn request_origin(headers: &HeaderMap) -> String {
    let scheme = match first_value(headers, "x-forwarded-proto") {
        Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
        _ => "http",
    };
    let host = first_value(headers, "x-forwarded-host")
        .or_else(|| first_value(headers, header::HOST.as_str()))
        .unwrap_or("localhost");
    format!("{}://{}", scheme, host)
}

fn first_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
