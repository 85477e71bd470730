#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use chrono::Utc;
use game_portal::{
    AppState, StoreError, create_router,
    config::AppConfig,
    models::{
        AuditLogEntry, CatalogCounts, Category, CategoryInput, Game, GameRequest, GameViewDay,
        NewAuditEntry, ViewTrendPoint,
    },
    repository::{GameFilter, GameOrder, Repository, RepositoryState},
    session::{self, SessionClaims},
};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret";

// --- MOCK REPOSITORY IMPLEMENTATION ---

/// In-memory state behind `MockRepository`. Tests seed it, inject failures, then
/// inspect `calls` and `audit_entries` after the request.
#[derive(Default)]
pub struct MockState {
    pub games: Vec<Game>,
    pub categories: Vec<Category>,
    pub audit_entries: Vec<NewAuditEntry>,
    pub history: Vec<GameViewDay>,
    pub trend: Vec<ViewTrendPoint>,
    // Returned by every audit insert/read while set.
    pub audit_failure: Option<StoreError>,
    pub increment_failure: Option<StoreError>,
    pub daily_view_failure: Option<StoreError>,
    // Returned by category create/update while set.
    pub category_write_failure: Option<StoreError>,
    pub trend_failure: Option<StoreError>,
    pub calls: Vec<&'static str>,
}

#[derive(Default)]
pub struct MockRepository {
    pub state: Mutex<MockState>,
}

impl MockRepository {
    pub fn with_state(state: MockState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn called(&self, name: &str) -> bool {
        self.lock().calls.iter().any(|call| *call == name)
    }

    pub fn audit_entries(&self) -> Vec<NewAuditEntry> {
        self.lock().audit_entries.clone()
    }
}

impl MockState {
    fn with_counts(&self, mut category: Category) -> Category {
        category.games_count = self
            .games
            .iter()
            .filter(|g| g.category_id == Some(category.id))
            .count() as i64;
        category
    }

    fn category_name(&self, id: Option<Uuid>) -> Option<String> {
        id.and_then(|id| self.categories.iter().find(|c| c.id == id))
            .map(|c| c.name.clone())
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn list_games(&self, filter: GameFilter) -> Result<Vec<Game>, StoreError> {
        let mut state = self.lock();
        state.calls.push("list_games");

        let needle = filter.search.as_deref().map(str::to_lowercase);
        let mut games: Vec<Game> = state
            .games
            .iter()
            .filter(|g| !filter.featured_only || g.is_featured)
            .filter(|g| filter.category_id.is_none() || g.category_id == filter.category_id)
            .filter(|g| match &needle {
                Some(needle) => g.title.to_lowercase().contains(needle.as_str()),
                None => true,
            })
            .cloned()
            .collect();

        match filter.order {
            GameOrder::Newest => games.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            GameOrder::MostViewed => games.sort_by(|a, b| b.views.cmp(&a.views)),
        }
        if let Some(limit) = filter.limit {
            games.truncate(limit as usize);
        }
        Ok(games)
    }

    async fn get_game(&self, id: Uuid) -> Result<Option<Game>, StoreError> {
        let mut state = self.lock();
        state.calls.push("get_game");
        Ok(state.games.iter().find(|g| g.id == id).cloned())
    }

    async fn related_games(
        &self,
        category_id: Uuid,
        exclude: Uuid,
        limit: i64,
    ) -> Result<Vec<Game>, StoreError> {
        let mut state = self.lock();
        state.calls.push("related_games");
        Ok(state
            .games
            .iter()
            .filter(|g| g.category_id == Some(category_id) && g.id != exclude)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let mut state = self.lock();
        state.calls.push("list_categories");
        Ok(state
            .categories
            .iter()
            .cloned()
            .map(|c| state.with_counts(c))
            .collect())
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        let mut state = self.lock();
        state.calls.push("get_category");
        Ok(state
            .categories
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .map(|c| state.with_counts(c)))
    }

    async fn get_counts(&self) -> Result<CatalogCounts, StoreError> {
        let mut state = self.lock();
        state.calls.push("get_counts");
        Ok(CatalogCounts {
            total_games: state.games.len() as i64,
            total_categories: state.categories.len() as i64,
            total_views: state.games.iter().map(|g| g.views).sum(),
        })
    }

    async fn create_game(&self, req: GameRequest) -> Result<Game, StoreError> {
        let mut state = self.lock();
        state.calls.push("create_game");
        let game = Game {
            id: Uuid::new_v4(),
            title: req.title,
            description: req.description,
            game_url: req.game_url,
            cover_url: req.cover_url,
            category_id: req.category_id,
            is_featured: req.is_featured,
            views: 0,
            created_at: Utc::now(),
            category_name: state.category_name(req.category_id),
        };
        state.games.push(game.clone());
        Ok(game)
    }

    async fn update_game(&self, id: Uuid, req: GameRequest) -> Result<Option<Game>, StoreError> {
        let mut state = self.lock();
        state.calls.push("update_game");
        let category_name = state.category_name(req.category_id);
        Ok(state.games.iter_mut().find(|g| g.id == id).map(|game| {
            game.title = req.title;
            game.description = req.description;
            game.game_url = req.game_url;
            game.cover_url = req.cover_url;
            game.category_id = req.category_id;
            game.is_featured = req.is_featured;
            game.category_name = category_name;
            game.clone()
        }))
    }

    async fn delete_game(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.lock();
        state.calls.push("delete_game");
        let before = state.games.len();
        state.games.retain(|g| g.id != id);
        Ok(state.games.len() < before)
    }

    async fn create_category(&self, input: CategoryInput) -> Result<Category, StoreError> {
        let mut state = self.lock();
        state.calls.push("create_category");
        if let Some(err) = state.category_write_failure.clone() {
            return Err(err);
        }
        let category = Category {
            id: Uuid::new_v4(),
            name: input.name,
            slug: input.slug,
            created_at: Utc::now(),
            games_count: 0,
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: Uuid,
        input: CategoryInput,
    ) -> Result<Option<Category>, StoreError> {
        let mut state = self.lock();
        state.calls.push("update_category");
        if let Some(err) = state.category_write_failure.clone() {
            return Err(err);
        }
        let updated = state.categories.iter_mut().find(|c| c.id == id).map(|c| {
            c.name = input.name;
            c.slug = input.slug;
            c.clone()
        });
        Ok(updated.map(|c| state.with_counts(c)))
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.lock();
        state.calls.push("delete_category");
        let before = state.categories.len();
        state.categories.retain(|c| c.id != id);
        Ok(state.categories.len() < before)
    }

    async fn increment_game_views(&self, id: Uuid) -> Result<Option<i64>, StoreError> {
        let mut state = self.lock();
        state.calls.push("increment_game_views");
        if let Some(err) = state.increment_failure.clone() {
            return Err(err);
        }
        Ok(state.games.iter_mut().find(|g| g.id == id).map(|game| {
            game.views += 1;
            game.views
        }))
    }

    async fn append_daily_view(&self, _id: Uuid) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.calls.push("append_daily_view");
        match state.daily_view_failure.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn game_view_history(&self, id: Uuid) -> Result<Vec<GameViewDay>, StoreError> {
        let mut state = self.lock();
        state.calls.push("game_view_history");
        Ok(state
            .history
            .iter()
            .filter(|day| day.game_id == id)
            .cloned()
            .collect())
    }

    async fn views_trend(&self, _days: i32) -> Result<Vec<ViewTrendPoint>, StoreError> {
        let mut state = self.lock();
        state.calls.push("views_trend");
        match state.trend_failure.clone() {
            Some(err) => Err(err),
            None => Ok(state.trend.clone()),
        }
    }

    async fn insert_audit_entry(&self, entry: NewAuditEntry) -> Result<Uuid, StoreError> {
        let mut state = self.lock();
        state.calls.push("insert_audit_entry");
        if let Some(err) = state.audit_failure.clone() {
            return Err(err);
        }
        state.audit_entries.push(entry);
        Ok(Uuid::new_v4())
    }

    async fn recent_audit_entries(&self, limit: i64) -> Result<Vec<AuditLogEntry>, StoreError> {
        let mut state = self.lock();
        state.calls.push("recent_audit_entries");
        if let Some(err) = state.audit_failure.clone() {
            return Err(err);
        }
        Ok(state
            .audit_entries
            .iter()
            .rev()
            .take(limit as usize)
            .map(|entry| AuditLogEntry {
                id: Uuid::new_v4(),
                user_id: entry.user_id,
                operation_type: entry.operation_type.to_string(),
                target_table: entry.target_table.clone(),
                target_id: entry.target_id.clone(),
                details: entry.details.clone(),
                ip_address: Some(entry.ip_address.clone()),
                created_at: Utc::now(),
            })
            .collect())
    }
}

// --- App Scaffolding ---

pub fn test_config() -> AppConfig {
    AppConfig {
        session_secret: TEST_SECRET.to_string(),
        admin_username: "keeper".to_string(),
        admin_password: "s3cret".to_string(),
        admin_user_id: Some(Uuid::from_u128(7)),
        ..AppConfig::default()
    }
}

pub fn app(repo: Arc<MockRepository>) -> Router {
    let state = AppState {
        repo: repo as RepositoryState,
        config: test_config(),
    };
    create_router(state)
}

/// Cookie header value for a signed admin session.
pub fn admin_cookie() -> String {
    let config = test_config();
    let token = session::issue_token(
        &SessionClaims::admin(config.admin_user_id),
        &config.session_secret,
    )
    .unwrap();
    format!("session={token}")
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn admin_request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("cookie", admin_cookie())
        .header("x-forwarded-for", "203.0.113.5, 10.0.0.1");
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// --- Fixtures ---

pub fn category(name: &str) -> Category {
    Category {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: name.to_lowercase(),
        created_at: Utc::now(),
        games_count: 0,
    }
}

pub fn game(title: &str, category: Option<&Category>, views: i64) -> Game {
    Game {
        id: Uuid::new_v4(),
        title: title.to_string(),
        game_url: format!("https://games.test/{}", title.to_lowercase()),
        category_id: category.map(|c| c.id),
        category_name: category.map(|c| c.name.clone()),
        views,
        created_at: Utc::now(),
        ..Game::default()
    }
}

pub fn missing_relation() -> StoreError {
    StoreError::MissingRelation("relation \"operation_logs\" does not exist".to_string())
}

pub fn query_failure() -> StoreError {
    StoreError::Query("permission denied for table operation_logs".to_string())
}
