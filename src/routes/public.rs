use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session: the storefront reads, login and logout,
/// view tracking and the audit log intake.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /api/home
        // Featured games, all games and categories for the landing page.
        .route("/api/home", get(handlers::get_home))
        // GET /api/games?category=...
        .route("/api/games", get(handlers::get_games))
        // GET /api/games/{id}
        // Detail page payload. Counts one view as a side effect.
        .route("/api/games/{id}", get(handlers::get_game_details))
        .route("/api/categories", get(handlers::get_categories))
        // GET /api/views
        // All games ranked by view count.
        .route("/api/views", get(handlers::get_view_ranking))
        // --- Session ---
        .route("/api/login", post(handlers::login))
        .route("/api/logout", post(handlers::logout))
        // POST /api/logs
        // Operation log intake. A missing audit table is reported as success.
        .route("/api/logs", post(handlers::write_audit_log))
        // POST /api/game-views records a view; GET returns history or trend data.
        .route(
            "/api/game-views",
            get(handlers::get_view_data).post(handlers::record_game_view),
        )
}
