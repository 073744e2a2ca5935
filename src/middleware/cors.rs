//! CORS layer built from the configured origin list.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Build the CORS layer. An empty list or a `*` entry mirrors the
/// request origin (development mode); otherwise only the origins that
/// parse are allowed.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static("x-requested-with")]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base
            .allow_origin(AllowOrigin::mirror_request())
            .allow_credentials(true);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        tracing::warn!("no valid CORS origins configured, allowing any origin");
        base.allow_origin(Any)
    } else {
        base.allow_origin(AllowOrigin::list(allowed))
            .allow_credentials(true)
    }
}
