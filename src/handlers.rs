use crate::{
    AppState, audit,
    audit::AuditContext,
    auth::{AdminSession, CurrentSession},
    catalog,
    error::{AppError, ErrorBody},
    models::{
        AuditLogEntry, AuditLogRequest, AuditLogResponse, Category, CategoryRequest,
        DashboardStats, Game, GameDetail, GameRequest, HomeFeed, LoginRequest, LoginResponse,
        MutationResponse, OperationType, ViewData, ViewDataResponse, ViewRecorded, ViewRequest,
    },
    repository::GameFilter,
    session::{self, CLEARED_SESSION_COOKIE},
    views::{self, ViewRange},
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, header},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

const RELATED_GAMES: i64 = 4;
const HOME_FEATURED: i64 = 3;
const HOME_LATEST: i64 = 6;
// Numeric detail ids address this many most-viewed games.
const RANKED_LOOKUP: i64 = 20;
const DASHBOARD_LIST_SIZE: i64 = 5;
const AUDIT_PAGE_SIZE: i64 = 100;
const SESSIONS_TABLE: &str = "sessions";

// --- Query Structs ---

/// GameListQuery
///
/// Query parameters of the public game listing.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct GameListQuery {
    /// Only games of this category.
    pub category: Option<Uuid>,
}

/// GameSearchQuery
///
/// Query parameters of the back-office game listing.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct GameSearchQuery {
    /// Case-insensitive match on the title or the category name.
    pub search: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct DashboardQuery {
    /// `week` (default), `month` or `year`.
    pub range: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ViewDataQuery {
    /// Per-day history of one game instead of the overall trend.
    pub game_id: Option<Uuid>,
    /// Trend window in days (1-365, default 7).
    pub days: Option<i32>,
}

/// Maps a malformed JSON body to a validation error instead of axum's plain-text rejection.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

fn mutation<T>(data: T, status: audit::AuditStatus) -> Json<MutationResponse<T>> {
    Json(MutationResponse {
        data,
        audit_warning: status.into_warning(),
    })
}

// --- Session Handlers ---

/// login
///
/// [Public Route] Exchanges the back-office credentials for a session cookie.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let credentials = json_body(payload)?;
    let claims = session::authenticate(&state.config, &credentials.username, &credentials.password)
        .inspect_err(|_| tracing::info!("rejected back-office login"))?;
    let token = session::issue_token(&claims, &state.config.session_secret)?;

    let ctx = AuditContext::from_headers(&headers, Some(&claims));
    audit::record_best_effort(
        state.repo.as_ref(),
        AuditLogRequest::new(OperationType::Login, SESSIONS_TABLE),
        &ctx,
    )
    .await;

    Ok((
        [(header::SET_COOKIE, session::session_cookie(&token))],
        Json(LoginResponse { success: true }),
    ))
}

/// logout
///
/// [Public Route] Clears the session cookie.
#[utoipa::path(
    post,
    path = "/api/logout",
    responses((status = 200, description = "Session cleared", body = LoginResponse))
)]
pub async fn logout(
    State(state): State<AppState>,
    CurrentSession(current): CurrentSession,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(claims) = current.as_ref() {
        let ctx = AuditContext::from_headers(&headers, Some(claims));
        audit::record_best_effort(
            state.repo.as_ref(),
            AuditLogRequest::new(OperationType::Logout, SESSIONS_TABLE),
            &ctx,
        )
        .await;
    }

    (
        [(header::SET_COOKIE, CLEARED_SESSION_COOKIE)],
        Json(LoginResponse { success: true }),
    )
}

// --- Audit Log Handlers ---

/// write_audit_log
///
/// [Public Route] Records one operation log entry.
///
/// A missing audit table still answers `success: true` with a null `logId`.
#[utoipa::path(
    post,
    path = "/api/logs",
    request_body = AuditLogRequest,
    responses(
        (status = 200, description = "Recorded", body = AuditLogResponse),
        (status = 400, description = "Missing or invalid fields", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn write_audit_log(
    State(state): State<AppState>,
    CurrentSession(current): CurrentSession,
    headers: HeaderMap,
    payload: Result<Json<AuditLogRequest>, JsonRejection>,
) -> Result<Json<AuditLogResponse>, AppError> {
    let request = json_body(payload)?;
    let ctx = AuditContext::from_headers(&headers, current.as_ref());
    let outcome = audit::record(state.repo.as_ref(), request, &ctx).await?;

    Ok(Json(AuditLogResponse {
        success: true,
        log_id: outcome.log_id(),
    }))
}

/// get_audit_logs
///
/// [Admin Route] The latest operation log entries, newest first. Empty while the
/// audit table is not provisioned.
#[utoipa::path(
    get,
    path = "/admin/logs",
    responses((status = 200, description = "Operation log", body = [AuditLogEntry]))
)]
pub async fn get_audit_logs(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<AuditLogEntry>>, AppError> {
    match state.repo.recent_audit_entries(AUDIT_PAGE_SIZE).await {
        Ok(entries) => Ok(Json(entries)),
        Err(err) if err.is_missing_relation() => Ok(Json(vec![])),
        Err(err) => Err(err.into()),
    }
}

// --- Public Catalog Handlers ---

/// get_home
///
/// [Public Route] The newest featured games, the newest games and all categories.
#[utoipa::path(
    get,
    path = "/api/home",
    responses((status = 200, description = "Landing page data", body = HomeFeed))
)]
pub async fn get_home(State(state): State<AppState>) -> Result<Json<HomeFeed>, AppError> {
    let featured = state
        .repo
        .list_games(GameFilter {
            featured_only: true,
            ..GameFilter::newest(HOME_FEATURED)
        })
        .await?;
    let games = state.repo.list_games(GameFilter::newest(HOME_LATEST)).await?;
    let categories = state.repo.list_categories().await?;

    Ok(Json(HomeFeed {
        featured,
        games,
        categories,
    }))
}

/// get_games
///
/// [Public Route] Lists games newest first, optionally within one category.
#[utoipa::path(
    get,
    path = "/api/games",
    params(GameListQuery),
    responses((status = 200, description = "Games", body = [Game]))
)]
pub async fn get_games(
    State(state): State<AppState>,
    Query(query): Query<GameListQuery>,
) -> Result<Json<Vec<Game>>, AppError> {
    let games = state
        .repo
        .list_games(GameFilter {
            category_id: query.category,
            ..GameFilter::default()
        })
        .await?;
    Ok(Json(games))
}

/// Resolves a detail-page id: a UUID, or `N` for the N-th most viewed game.
async fn resolve_game_id(state: &AppState, raw: &str) -> Result<Uuid, AppError> {
    if let Ok(id) = Uuid::parse_str(raw) {
        return Ok(id);
    }

    let rank = match raw.parse::<usize>() {
        Ok(rank) if raw.bytes().all(|b| b.is_ascii_digit()) && rank >= 1 => rank,
        _ => return Err(AppError::NotFound("game")),
    };

    state
        .repo
        .list_games(GameFilter::most_viewed(Some(RANKED_LOOKUP)))
        .await?
        .get(rank - 1)
        .map(|game| game.id)
        .ok_or(AppError::NotFound("game"))
}

/// get_game_details
///
/// [Public Route] One game with related games. Serving the page counts a view;
/// a failed count never fails the page.
#[utoipa::path(
    get,
    path = "/api/games/{id}",
    params(("id" = String, Path, description = "Game ID, or N for the N-th most viewed game")),
    responses(
        (status = 200, description = "Found", body = GameDetail),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_game_details(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<GameDetail>, AppError> {
    let id = resolve_game_id(&state, raw_id.trim()).await?;
    let mut game = state
        .repo
        .get_game(id)
        .await?
        .ok_or(AppError::NotFound("game"))?;

    let related = match game.category_id {
        Some(category_id) => state
            .repo
            .related_games(category_id, id, RELATED_GAMES)
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(game_id = %id, error = %err, "failed to load related games");
                vec![]
            }),
        None => vec![],
    };

    if let Some(views) = views::record_view_best_effort(state.repo.as_ref(), id).await {
        game.views = views;
    }

    Ok(Json(GameDetail { game, related }))
}

/// get_categories
///
/// [Public Route] All categories by name, with their game counts.
#[utoipa::path(
    get,
    path = "/api/categories",
    responses((status = 200, description = "Categories", body = [Category]))
)]
pub async fn get_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.repo.list_categories().await?))
}

/// get_view_ranking
///
/// [Public Route] All games ranked by views.
#[utoipa::path(
    get,
    path = "/api/views",
    responses((status = 200, description = "Games by views", body = [Game]))
)]
pub async fn get_view_ranking(State(state): State<AppState>) -> Result<Json<Vec<Game>>, AppError> {
    Ok(Json(state.repo.list_games(GameFilter::most_viewed(None)).await?))
}

// --- View Tracking Handlers ---

/// record_game_view
///
/// [Public Route] Adds one view to a game.
#[utoipa::path(
    post,
    path = "/api/game-views",
    request_body = ViewRequest,
    responses(
        (status = 200, description = "View recorded", body = ViewRecorded),
        (status = 400, description = "Missing gameId", body = ErrorBody),
        (status = 404, description = "Unknown game", body = ErrorBody)
    )
)]
pub async fn record_game_view(
    State(state): State<AppState>,
    payload: Result<Json<ViewRequest>, JsonRejection>,
) -> Result<Json<ViewRecorded>, AppError> {
    let game_id = json_body(payload)?
        .game_id
        .ok_or_else(|| AppError::Validation("gameId is required".to_string()))?;

    let views = views::record_view(state.repo.as_ref(), game_id).await?;
    Ok(Json(ViewRecorded {
        success: true,
        views,
    }))
}

/// get_view_data
///
/// [Public Route] Per-day history of one game, or the trend across all games.
#[utoipa::path(
    get,
    path = "/api/game-views",
    params(ViewDataQuery),
    responses((status = 200, description = "View data", body = ViewDataResponse))
)]
pub async fn get_view_data(
    State(state): State<AppState>,
    Query(query): Query<ViewDataQuery>,
) -> Result<Json<ViewDataResponse>, AppError> {
    let data = match query.game_id {
        Some(game_id) => ViewData::History(state.repo.game_view_history(game_id).await?),
        None => {
            let days = views::trend_days(query.days)?;
            ViewData::Trend(state.repo.views_trend(days).await?)
        }
    };
    Ok(Json(ViewDataResponse { data }))
}

// --- Admin: Dashboard ---

/// get_dashboard
///
/// [Admin Route] Counters, recent and most viewed games, and the view trend. A
/// failed trend query degrades to an empty series.
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    params(DashboardQuery),
    responses((status = 200, description = "Dashboard", body = DashboardStats))
)]
pub async fn get_dashboard(
    _admin: AdminSession,
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardStats>, AppError> {
    let range = ViewRange::parse(query.range.as_deref());

    let counts = state.repo.get_counts().await?;
    let recent_games = state
        .repo
        .list_games(GameFilter::newest(DASHBOARD_LIST_SIZE))
        .await?;
    let top_games = state
        .repo
        .list_games(GameFilter::most_viewed(Some(DASHBOARD_LIST_SIZE)))
        .await?;
    let views_trend = state
        .repo
        .views_trend(range.days())
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to load views trend");
            vec![]
        });

    Ok(Json(DashboardStats {
        total_games: counts.total_games,
        total_categories: counts.total_categories,
        total_views: counts.total_views,
        recent_games,
        top_games,
        views_trend,
    }))
}

// --- Admin: Games ---

/// get_admin_games
///
/// [Admin Route] All games newest first, optionally filtered by a search term.
#[utoipa::path(
    get,
    path = "/admin/games",
    params(GameSearchQuery),
    responses((status = 200, description = "Games", body = [Game]))
)]
pub async fn get_admin_games(
    _admin: AdminSession,
    State(state): State<AppState>,
    Query(query): Query<GameSearchQuery>,
) -> Result<Json<Vec<Game>>, AppError> {
    let games = state
        .repo
        .list_games(GameFilter {
            search: query.search,
            ..GameFilter::default()
        })
        .await?;
    Ok(Json(games))
}

/// create_game
///
/// [Admin Route] Adds a game and records a `create` audit entry.
#[utoipa::path(
    post,
    path = "/admin/games",
    request_body = GameRequest,
    responses(
        (status = 200, description = "Created", body = MutationResponse<Game>),
        (status = 400, description = "Missing fields", body = ErrorBody)
    )
)]
pub async fn create_game(
    AdminSession(session): AdminSession,
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<GameRequest>, JsonRejection>,
) -> Result<Json<MutationResponse<Game>>, AppError> {
    let req = catalog::validate_game(json_body(payload)?)?;
    let game = state.repo.create_game(req.clone()).await?;

    let audit_status = audit::record_best_effort(
        state.repo.as_ref(),
        AuditLogRequest::new(OperationType::Create, "games")
            .with_target(game.id)
            .with_details(json!({ "title": game.title, "data": req })),
        &AuditContext::from_headers(&headers, Some(&session)),
    )
    .await;

    Ok(mutation(game, audit_status))
}

/// update_game
///
/// [Admin Route] Replaces a game and records an `update` audit entry with the
/// previous and updated values.
#[utoipa::path(
    put,
    path = "/admin/games/{id}",
    params(("id" = Uuid, Path, description = "Game ID")),
    request_body = GameRequest,
    responses(
        (status = 200, description = "Updated", body = MutationResponse<Game>),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_game(
    AdminSession(session): AdminSession,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    payload: Result<Json<GameRequest>, JsonRejection>,
) -> Result<Json<MutationResponse<Game>>, AppError> {
    let req = catalog::validate_game(json_body(payload)?)?;
    let previous = state
        .repo
        .get_game(id)
        .await?
        .ok_or(AppError::NotFound("game"))?;
    let game = state
        .repo
        .update_game(id, req.clone())
        .await?
        .ok_or(AppError::NotFound("game"))?;

    let audit_status = audit::record_best_effort(
        state.repo.as_ref(),
        AuditLogRequest::new(OperationType::Update, "games")
            .with_target(id)
            .with_details(json!({ "title": game.title, "previous": previous, "updated": req })),
        &AuditContext::from_headers(&headers, Some(&session)),
    )
    .await;

    Ok(mutation(game, audit_status))
}

/// delete_game
///
/// [Admin Route] Removes a game and records a `delete` audit entry holding the
/// deleted row.
#[utoipa::path(
    delete,
    path = "/admin/games/{id}",
    params(("id" = Uuid, Path, description = "Game ID")),
    responses(
        (status = 200, description = "Deleted", body = MutationResponse<Game>),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_game(
    AdminSession(session): AdminSession,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<MutationResponse<Game>>, AppError> {
    let game = state
        .repo
        .get_game(id)
        .await?
        .ok_or(AppError::NotFound("game"))?;

    if !state.repo.delete_game(id).await? {
        return Err(AppError::NotFound("game"));
    }

    let audit_status = audit::record_best_effort(
        state.repo.as_ref(),
        AuditLogRequest::new(OperationType::Delete, "games")
            .with_target(id)
            .with_details(json!({ "title": game.title, "deleted": game })),
        &AuditContext::from_headers(&headers, Some(&session)),
    )
    .await;

    Ok(mutation(game, audit_status))
}

// --- Admin: Categories ---

/// get_admin_categories
///
/// [Admin Route] All categories with their game counts.
#[utoipa::path(
    get,
    path = "/admin/categories",
    responses((status = 200, description = "Categories", body = [Category]))
)]
pub async fn get_admin_categories(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.repo.list_categories().await?))
}

/// create_category
///
/// [Admin Route] Adds a category, deriving the slug from the name when omitted.
#[utoipa::path(
    post,
    path = "/admin/categories",
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Created", body = MutationResponse<Category>),
        (status = 400, description = "Missing name", body = ErrorBody)
    )
)]
pub async fn create_category(
    AdminSession(session): AdminSession,
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CategoryRequest>, JsonRejection>,
) -> Result<Json<MutationResponse<Category>>, AppError> {
    let input = catalog::validate_category(json_body(payload)?)?;
    let category = state.repo.create_category(input).await?;

    let audit_status = audit::record_best_effort(
        state.repo.as_ref(),
        AuditLogRequest::new(OperationType::Create, "categories")
            .with_target(category.id)
            .with_details(json!({ "name": category.name, "data": category })),
        &AuditContext::from_headers(&headers, Some(&session)),
    )
    .await;

    Ok(mutation(category, audit_status))
}

/// update_category
///
/// [Admin Route] Renames a category.
#[utoipa::path(
    put,
    path = "/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Updated", body = MutationResponse<Category>),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_category(
    AdminSession(session): AdminSession,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    payload: Result<Json<CategoryRequest>, JsonRejection>,
) -> Result<Json<MutationResponse<Category>>, AppError> {
    let input = catalog::validate_category(json_body(payload)?)?;
    let previous = state
        .repo
        .get_category(id)
        .await?
        .ok_or(AppError::NotFound("category"))?;
    let category = state
        .repo
        .update_category(id, input)
        .await?
        .ok_or(AppError::NotFound("category"))?;

    let audit_status = audit::record_best_effort(
        state.repo.as_ref(),
        AuditLogRequest::new(OperationType::Update, "categories")
            .with_target(id)
            .with_details(json!({ "name": category.name, "previous": previous, "updated": category })),
        &AuditContext::from_headers(&headers, Some(&session)),
    )
    .await;

    Ok(mutation(category, audit_status))
}

/// delete_category
///
/// [Admin Route] Removes an empty category. A category that still has games is
/// rejected before the delete reaches the store.
#[utoipa::path(
    delete,
    path = "/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Deleted", body = MutationResponse<Category>),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 409, description = "Category still has games", body = ErrorBody)
    )
)]
pub async fn delete_category(
    AdminSession(session): AdminSession,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<MutationResponse<Category>>, AppError> {
    let category = state
        .repo
        .get_category(id)
        .await?
        .ok_or(AppError::NotFound("category"))?;
    catalog::ensure_deletable(&category)?;

    if !state.repo.delete_category(id).await? {
        return Err(AppError::NotFound("category"));
    }

    let audit_status = audit::record_best_effort(
        state.repo.as_ref(),
        AuditLogRequest::new(OperationType::Delete, "categories")
            .with_target(id)
            .with_details(json!({ "name": category.name, "deleted": category })),
        &AuditContext::from_headers(&headers, Some(&session)),
    )
    .await;

    Ok(mutation(category, audit_status))
}
