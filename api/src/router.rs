//! Route table
//!
//! Read routes are public; write routes sit behind the optional per-IP limiter.

use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::StartupError;
use crate::handlers;
use crate::AppState;

/// Build the application router.
///
/// # Errors
/// Returns `StartupError::RateLimit` if the configured limiter cannot be built.
pub fn build(state: AppState) -> Result<Router, StartupError> {
    let mut write_routes = Router::new()
        .route("/users", post(handlers::create_user))
        .route(
            "/users/:id",
            patch(handlers::update_user).delete(handlers::delete_user),
        );

    // Uses PeerIpKeyExtractor, so the router must be served with connect info
    if let Some(limit) = state.config.rate_limit {
        let governor_config = Arc::new(
            GovernorConfigBuilder::default()
                .key_extractor(PeerIpKeyExtractor)
                .period(limit.period())
                .burst_size(limit.burst)
                .finish()
                .ok_or_else(|| {
                    StartupError::RateLimit(format!(
                        "{} per second with burst {}",
                        limit.per_second, limit.burst
                    ))
                })?,
        );
        tracing::info!(
            per_second = limit.per_second,
            burst = limit.burst,
            "Rate limiting enabled for write routes"
        );
        write_routes = write_routes.layer(GovernorLayer {
            config: governor_config,
        });
    }

    Ok(Router::new()
        .route("/health", get(handlers::health))
        .route("/users", get(handlers::list_users))
        .route("/users/:id", get(handlers::get_user))
        .merge(write_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::RateLimit;
    use crate::test_utils::test_state;

    #[tokio::test]
    async fn unknown_route_is_404() {
        let response = build(test_state())
            .unwrap()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn read_and_write_methods_share_paths() {
        let app = build(test_state()).unwrap();

        let response = app
            .clone()
            .oneshot(Request::get("/users").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::put("/users/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn rate_limited_router_still_serves_reads() {
        let mut state = test_state();
        let mut config = (*state.config).clone();
        config.rate_limit = Some(RateLimit {
            per_second: 1,
            burst: 1,
        });
        state.config = Arc::new(config);

        let response = build(state)
            .unwrap()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn unbuildable_limiter_is_a_startup_error() {
        let mut state = test_state();
        let mut config = (*state.config).clone();
        config.rate_limit = Some(RateLimit {
            per_second: 1,
            burst: 0,
        });
        state.config = Arc::new(config);

        assert!(matches!(build(state), Err(StartupError::RateLimit(_))));
    }
}
