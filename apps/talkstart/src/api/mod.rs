//! # talkstart HTTP API Module
//!
//! Serves the screening wizard over HTTP using axum. Each client creates a
//! session and drives it through the same transitions as the terminal
//! wizard.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /catalog` - Age groups and milestone questions
//! - `POST /sessions` - Create a session
//! - `GET /sessions/{id}` - Session state
//! - `DELETE /sessions/{id}` - Discard a session
//! - `POST /sessions/{id}/begin` - Welcome -> age selection
//! - `POST /sessions/{id}/back` - Age selection -> welcome
//! - `POST /sessions/{id}/select` - Choose an age group
//! - `POST /sessions/{id}/answer` - Answer the current question
//! - `POST /sessions/{id}/restart` - Results -> welcome
//! - `POST /sessions/{id}/save` - Export the results report
//! - `POST /sessions/{id}/feedback` - Rate the results
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `TALKSTART_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `TALKSTART_RATE_LIMIT`: Requests per second (default: 50, 0 to disable)
//! - `TALKSTART_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod store;
mod types;

pub use auth::{get_api_key_from_env, keys_match};
pub use middleware::{
    DEFAULT_RATE_LIMIT, create_rate_limiter, get_rate_limit_from_env, parse_rate_limit,
};
pub use store::{MAX_SESSIONS, SessionStore};
// Re-export handlers and types for integration tests (via `talkstart::api::*`)
#[allow(unused_imports)]
pub use handlers::{
    answer_handler, back_handler, begin_handler, catalog_handler, create_session_handler,
    delete_session_handler, feedback_handler, get_session_handler, health_handler,
    restart_handler, save_handler, select_handler,
};
#[allow(unused_imports)]
pub use types::{
    AgeGroupSummary, AnswerRequest, CatalogResponse, FeedbackRequest, HealthResponse,
    QuestionView, ResultView, SaveResponse, SelectRequest, SessionResponse, SessionView,
};

use crate::error::AppError;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use std::sync::Arc;
use talkstart_core::{AnalyticsSink, Catalog, ScreeningSession};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Request bodies are tiny; anything larger is rejected.
const MAX_BODY_BYTES: usize = 64 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: one catalog, one sink, many sessions.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub sink: Arc<dyn AnalyticsSink>,
    pub sessions: Arc<RwLock<SessionStore>>,
}

impl AppState {
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, sink: Arc<dyn AnalyticsSink>) -> Self {
        Self::with_store(catalog, sink, SessionStore::default())
    }

    #[must_use]
    pub fn with_store(
        catalog: Arc<Catalog>,
        sink: Arc<dyn AnalyticsSink>,
        store: SessionStore,
    ) -> Self {
        Self {
            catalog,
            sink,
            sessions: Arc::new(RwLock::new(store)),
        }
    }

    /// A fresh session bound to this server's catalog and sink.
    pub fn new_session(&self) -> ScreeningSession {
        ScreeningSession::new(self.catalog.clone(), self.sink.clone())
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer from `TALKSTART_CORS_ORIGINS`.
///
/// - "*": any origin
/// - unset or no valid entries: localhost only
/// - otherwise: the comma-separated list
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("TALKSTART_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (TALKSTART_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in TALKSTART_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                cors_for(allowed_origins)
            }
        }
        None => {
            tracing::info!("CORS: No TALKSTART_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    cors_for(origins)
}

fn cors_for(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner): tracing, CORS, body limit,
/// rate limiting (if enabled), authentication (if configured).
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible. \
             Set TALKSTART_API_KEY to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/catalog", get(handlers::catalog_handler))
        .route("/sessions", post(handlers::create_session_handler))
        .route(
            "/sessions/{id}",
            get(handlers::get_session_handler).delete(handlers::delete_session_handler),
        )
        .route("/sessions/{id}/begin", post(handlers::begin_handler))
        .route("/sessions/{id}/back", post(handlers::back_handler))
        .route("/sessions/{id}/select", post(handlers::select_handler))
        .route("/sessions/{id}/answer", post(handlers::answer_handler))
        .route("/sessions/{id}/restart", post(handlers::restart_handler))
        .route("/sessions/{id}/save", post(handlers::save_handler))
        .route("/sessions/{id}/feedback", post(handlers::feedback_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Bind `addr` and serve until Ctrl+C.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), AppError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Io(format!("Bind failed: {}", e)))?;

    tracing::info!("talkstart HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Io(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
