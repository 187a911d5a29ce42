//! Defines the full HTTP surface of the gateway.
//!
//! ## Structure
//! - `POST /api/upload`: single-file upload to the active storage backend
//! - `GET  /uploads/{*file}`: stored files, local backend only, dotfiles hidden
//! - `GET  /healthz`, `GET /readyz`: probes
//! - `/api/{auth,comments,likes,posts,users,relationships,stories}/*`: route groups
//! - anything else: `404 {"error":"Not found"}`
//!
//! Every route, fallback included, runs behind tracing, CORS and cookie
//! parsing.

use crate::{
    handlers::{
        fallback_handlers::not_found,
        health_handlers::{healthz, readyz},
        upload_handlers::upload_file,
    },
    middleware::{cors_layer, hide_dotfiles, parse_cookies},
    routes::mount_table::RouteGroups,
    services::{local_store::PUBLIC_PREFIX, storage_service::StorageService},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Headroom for multipart boundaries and part headers on top of the file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the application router.
///
/// Static file serving is only mounted when the local backend is active.
pub fn routes(
    storage: StorageService,
    groups: RouteGroups,
    cors_allowed_origins: &[String],
) -> Router {
    let body_limit = storage
        .max_upload_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let mut router = Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(
            "/api/upload",
            post(upload_file).layer(DefaultBodyLimit::max(body_limit)),
        );

    if let Some(dir) = storage.local_dir() {
        let files = ServeDir::new(dir).not_found_service(not_found.into_service());
        let static_files: Router = Router::new()
            .fallback_service(files)
            .layer(from_fn(hide_dotfiles));
        router = router.nest_service(PUBLIC_PREFIX, static_files);
    }

    groups
        .mount(router)
        // must stay last so it never shadows a real route
        .fallback(not_found)
        .with_state(storage)
        .layer(from_fn(parse_cookies))
        .layer(cors_layer(cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
}
