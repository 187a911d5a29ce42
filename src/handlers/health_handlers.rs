//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the active backend's directory

use crate::services::storage_service::StorageService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::{collections::HashMap, path::Path};
use tokio::fs;
use uuid::Uuid;

const READY_MARKER: &[u8] = b"readyz";

/// `GET /healthz`
///
/// Very small liveness probe. Always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Performs a best-effort write/read/delete in the directory the active
/// backend writes to (upload directory for local, staging directory for
/// Cloudinary).
///
/// Returns JSON describing the check. HTTP 200 when it passes,
/// HTTP 503 when it fails.
pub async fn readyz(State(service): State<StorageService>) -> impl IntoResponse {
    let disk = disk_check(service.work_dir()).await;
    let ok = disk.is_ok();

    let mut checks = HashMap::new();
    checks.insert(
        "disk",
        CheckStatus {
            ok,
            error: disk.err(),
        },
    );

    let body = ReadyResponse {
        status: if ok { "ok".into() } else { "error".into() },
        backend: service.kind().to_string(),
        checks,
    };
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// Write, read back and delete a dot-prefixed marker file in `dir`.
///
/// The static mount never serves dotfiles, so the marker is not fetchable
/// through `/uploads` while it exists.
async fn disk_check(dir: &Path) -> Result<(), String> {
    let marker = dir.join(format!(".readyz-{}", Uuid::new_v4()));
    fs::write(&marker, READY_MARKER)
        .await
        .map_err(|e| format!("could not write tmp file: {}", e))?;

    let read = fs::read(&marker).await;
    let removed = fs::remove_file(&marker).await;
    match read {
        Ok(bytes) if bytes == READY_MARKER => {}
        Ok(_) => return Err("file content mismatch".to_string()),
        Err(e) => return Err(format!("could not read tmp file: {}", e)),
    }
    removed.map_err(|e| format!("could not remove tmp file: {}", e))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    backend: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
