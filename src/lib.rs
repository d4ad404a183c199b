use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    routing::get,
};

use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Route grouping and middleware chaining.
pub mod chain;
pub mod group;

// Request pipeline: middleware stages, handlers, errors.
pub mod auth;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;

// Collaborators and process setup.
pub mod config;
pub mod identity;
pub mod secrets;
pub mod server;

// --- Public Re-exports ---

pub use config::{AppConfig, Env};
pub use error::{ApiError, StartupError};
pub use group::{RouteError, RouteGroup, RouteTable};
pub use server::Application;

use identity::{DirectoryState, VerifierState};

/// AppState
///
/// Read-only state shared by every request: configuration plus the two
/// identity provider capabilities. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// Verifies bearer credentials. Holds its key material itself.
    pub verifier: VerifierState,
    /// Resolves subjects to user records.
    pub directory: DirectoryState,
}

// Let handlers and middleware pull single components out of `AppState`.

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for VerifierState {
    fn from_ref(app_state: &AppState) -> VerifierState {
        app_state.verifier.clone()
    }
}

impl FromRef<AppState> for DirectoryState {
    fn from_ref(app_state: &AppState) -> DirectoryState {
        app_state.directory.clone()
    }
}

/// create_router
///
/// The one place the route table is assembled. Mounts the `/api` and `/admin`
/// groups with their middleware chains, the public health route and the JSON
/// 404 fallback, then wraps everything in the request-id, tracing, panic and
/// CORS layers.
pub fn create_router(state: AppState) -> Result<Router, RouteError> {
    let table = RouteTable::new(state.clone())
        .route("/health", get(handlers::health))?
        .mount_group(
            "/api",
            routes::api::register,
            [
                auth::authenticate(state.verifier.clone()),
                auth::log_route(),
            ],
        )?
        .mount_group(
            "/admin",
            routes::admin::register,
            [
                auth::authenticate(state.verifier.clone()),
                auth::log_route(),
                auth::authorize_admin(state.directory.clone()),
            ],
        )?;

    for route in table.routes() {
        tracing::debug!(route, "route registered");
    }

    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    Ok(table
        .into_router()
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id))
                .layer(CatchPanicLayer::custom(error::panic_response)),
        )
        .layer(cors))
}

/// Span for one request, tagged with the `x-request-id` set above.
fn trace_span_logger(request: &Request) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
