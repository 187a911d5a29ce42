//! Request middleware: CORS and cookie parsing for every route, plus the
//! dotfile filter in front of the static mount.

use crate::handlers::fallback_handlers::not_found;
use axum::{
    extract::Request,
    http::{HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Parse the `Cookie` header once and hand route groups a [`CookieJar`]
/// through request extensions.
pub async fn parse_cookies(mut req: Request, next: Next) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    req.extensions_mut().insert(jar);
    next.run(req).await
}

/// Answer 404 for any path segment starting with a dot, encoded or not.
///
/// Uploaded names always start with a timestamp, so this only hides
/// housekeeping files such as the readiness marker.
pub async fn hide_dotfiles(req: Request, next: Next) -> Response {
    let hidden = req.uri().path().split('/').any(|segment| {
        segment.starts_with('.')
            || segment
                .get(..3)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("%2e"))
    });
    if hidden {
        return not_found().await.into_response();
    }
    next.run(req).await
}

/// Credentialed CORS.
///
/// With an empty allow-list the request origin is reflected, so any site may
/// make credentialed calls. Configure `CORS_ALLOWED_ORIGINS` to restrict it.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .expose_headers([header::CONTENT_TYPE]);

    if allowed_origins.is_empty() {
        tracing::warn!("no CORS allow-list configured; reflecting every request origin");
        return layer.allow_origin(AllowOrigin::mirror_request());
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::error!(%error, %origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Extension, Router, body::Body, http::StatusCode, routing::get};
    use tower::ServiceExt;

    async fn session_cookie(Extension(jar): Extension<CookieJar>) -> String {
        jar.get("accessToken")
            .map(|cookie| cookie.value().to_string())
            .unwrap_or_default()
    }

    fn app(origins: &[String]) -> Router {
        Router::new()
            .route("/whoami", get(session_cookie))
            .layer(axum::middleware::from_fn(parse_cookies))
            .layer(cors_layer(origins))
    }

    #[tokio::test]
    async fn cookies_are_available_as_extension() {
        let response = app(&[])
            .oneshot(
                axum::http::Request::builder()
                    .uri("/whoami")
                    .header(header::COOKIE, "theme=dark; accessToken=tok-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"tok-123");
    }

    #[tokio::test]
    async fn reflects_any_origin_without_allow_list() {
        let response = app(&[])
            .oneshot(
                axum::http::Request::builder()
                    .uri("/whoami")
                    .header(header::ORIGIN, "https://somewhere.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://somewhere.example"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[tokio::test]
    async fn allow_list_rejects_other_origins() {
        let origins = vec!["https://haifriends.app".to_string()];

        let allowed = app(&origins)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/whoami")
                    .header(header::ORIGIN, "https://haifriends.app")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://haifriends.app"
        );

        let denied = app(&origins)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/whoami")
                    .header(header::ORIGIN, "https://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(
            !denied
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }
}
