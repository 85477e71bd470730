use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod audit;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod session;
pub mod views;

// Routing split by audience (public, admin).
pub mod routes;
use routes::{admin, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, StoreError};
pub use repository::{PostgresRepository, Repository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every documented handler and schema, served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::logout, handlers::write_audit_log, handlers::get_audit_logs,
        handlers::get_home, handlers::get_games, handlers::get_game_details,
        handlers::get_categories, handlers::get_view_ranking, handlers::record_game_view,
        handlers::get_view_data, handlers::get_dashboard, handlers::get_admin_games,
        handlers::create_game, handlers::update_game, handlers::delete_game,
        handlers::get_admin_categories, handlers::create_category, handlers::update_category,
        handlers::delete_category
    ),
    components(
        schemas(
            models::Game, models::Category, models::GameViewDay, models::ViewTrendPoint,
            models::OperationType, models::AuditLogEntry, models::AuditLogRequest,
            models::AuditLogResponse, models::LoginRequest, models::LoginResponse,
            models::GameRequest, models::CategoryRequest, models::ViewRequest,
            models::GameDetail, models::HomeFeed, models::ViewRecorded, models::ViewData,
            models::ViewDataResponse, models::DashboardStats, error::ErrorBody,
        )
    ),
    tags(
        (name = "game-portal", description = "Game Portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cloneable state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Catalog, view and audit persistence.
    pub repo: RepositoryState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routes, the back-office route guard and the observability layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");
    let guard_config = state.config.clone();

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .nest("/admin", admin::admin_routes())
        .with_state(state)
        // The guard wraps every route so unmatched `/admin/...` paths redirect too.
        .layer(middleware::from_fn_with_state(
            guard_config,
            guard::route_guard,
        ));

    // 3. Observability and Correlation Layers
    base_router
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
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: tags every request span with its `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        path = %request.uri().path(),
        req_id = %request_id,
    )
}
