use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Back-office routes, nested under `/admin`. The route guard redirects
/// sessionless browsers to `/login` before they get here; each handler still
/// takes an `AdminSession`, so a request that slips past the guard is rejected
/// with 401.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/dashboard?range=week|month|year
        .route("/dashboard", get(handlers::get_dashboard))
        // --- Games ---
        .route(
            "/games",
            get(handlers::get_admin_games).post(handlers::create_game),
        )
        .route(
            "/games/{id}",
            put(handlers::update_game).delete(handlers::delete_game),
        )
        // --- Categories ---
        .route(
            "/categories",
            get(handlers::get_admin_categories).post(handlers::create_category),
        )
        // DELETE refuses categories that still have games (409).
        .route(
            "/categories/{id}",
            put(handlers::update_category).delete(handlers::delete_category),
        )
        // GET /admin/logs
        // Latest operation log entries.
        .route("/logs", get(handlers::get_audit_logs))
}
