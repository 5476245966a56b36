use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::{
    Clock, InMemoryStore, LiveUpdateHub, PollService, Stores, SystemClock,
};
use persistence::PgStore;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, security_headers_middleware, trace_id,
};
use crate::routes::{health, identity, live, polls, votes};
use crate::services::CookieHelper;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Present only with the PostgreSQL backend.
    pub pool: Option<PgPool>,
    pub service: PollService,
    pub cookies: CookieHelper,
}

/// Store handles for the configured backend.
///
/// With a pool the PostgreSQL store is used; without one, the in-memory store.
pub fn build_stores(pool: Option<&PgPool>) -> Stores {
    match pool {
        Some(pool) => Stores::from_backend(Arc::new(PgStore::new(pool.clone()))),
        None => Stores::from_backend(InMemoryStore::new()),
    }
}

/// Builds the poll service from configuration and store handles.
pub fn build_service(config: &Config, stores: Stores, clock: Arc<dyn Clock>) -> PollService {
    PollService::new(
        stores,
        LiveUpdateHub::new(config.live.channel_capacity),
        clock,
        config.tally.retry_policy(),
    )
}

pub fn create_app(config: Config, pool: Option<PgPool>) -> Router {
    let stores = build_stores(pool.as_ref());
    let service = build_service(&config, stores, Arc::new(SystemClock));
    create_app_with_service(config, service, pool)
}

/// Builds the router around an existing service. Tests use this to inject
/// their own stores and clock.
pub fn create_app_with_service(config: Config, service: PollService, pool: Option<PgPool>) -> Router {
    let config = Arc::new(config);

    let state = AppState {
        config: config.clone(),
        pool,
        service,
        cookies: CookieHelper::new(config.voter.clone()),
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        // Credentialed requests carry the voter cookie.
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::HeaderName::from_static("x-voter-token"),
                axum::http::HeaderName::from_static("x-request-id"),
            ])
            .allow_credentials(true)
    };

    let api_routes = Router::new()
        .route("/api/v1/identity", post(identity::get_or_create_identity))
        .route("/api/v1/polls", post(polls::create_poll))
        .route("/api/v1/polls/:poll_id", get(polls::get_poll))
        .route("/api/v1/polls/:poll_id/options", get(polls::list_options))
        .route("/api/v1/polls/:poll_id/results", get(polls::get_results))
        .route("/api/v1/polls/:poll_id/close", post(polls::close_poll))
        .route("/api/v1/polls/:poll_id/votes", post(votes::cast_vote))
        .route("/api/v1/polls/:poll_id/votes/me", get(votes::my_vote))
        .route("/api/v1/polls/:poll_id/events", get(live::poll_events));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
