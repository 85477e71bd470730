use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

// --- Catalog Schemas (Mapped to Database) ---

/// Game
///
/// A catalog entry from the `games` table, joined with its category name.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Game {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    // Embeddable URL rendered inside the player iframe.
    pub game_url: String,
    pub cover_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub is_featured: bool,
    pub views: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    // Loaded via a LEFT JOIN on `categories`.
    #[sqlx(default)]
    pub category_name: Option<String>,
}

/// Category
///
/// A row of the `categories` table with the number of games referencing it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub games_count: i64,
}

/// GameViewDay
///
/// Per-day view aggregate from the `game_views` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct GameViewDay {
    pub game_id: Uuid,
    #[ts(type = "string")]
    pub view_date: NaiveDate,
    pub view_count: i64,
}

/// ViewTrendPoint
///
/// Total views across all games for one day.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct ViewTrendPoint {
    #[ts(type = "string")]
    pub view_date: NaiveDate,
    pub total_views: i64,
}

// --- Audit Log Schemas ---

/// OperationType
///
/// The fixed set of operations an audit entry can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum OperationType {
    Create,
    Update,
    Delete,
    Login,
    Logout,
    Other,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Create => "create",
            OperationType::Update => "update",
            OperationType::Delete => "delete",
            OperationType::Login => "login",
            OperationType::Logout => "logout",
            OperationType::Other => "other",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(OperationType::Create),
            "update" => Ok(OperationType::Update),
            "delete" => Ok(OperationType::Delete),
            "login" => Ok(OperationType::Login),
            "logout" => Ok(OperationType::Logout),
            "other" => Ok(OperationType::Other),
            unknown => Err(AppError::Validation(format!(
                "unknown operation type '{unknown}'"
            ))),
        }
    }
}

/// AuditLogEntry
///
/// A stored row of the append-only `operation_logs` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub operation_type: String,
    pub target_table: String,
    pub target_id: Option<String>,
    pub details: Option<Value>,
    pub ip_address: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// NewAuditEntry
///
/// A validated audit entry ready to be inserted. `id` and `created_at` are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub operation_type: OperationType,
    pub target_table: String,
    pub target_id: Option<String>,
    pub details: Option<Value>,
    pub user_id: Option<Uuid>,
    pub ip_address: String,
}

/// AuditLogRequest
///
/// Body of `POST /api/logs`, and the builder admin handlers use to describe a
/// mutation. Fields stay optional here; `audit::validate` enforces presence.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuditLogRequest {
    pub user_id: Option<String>,
    pub operation_type: Option<String>,
    pub target_table: Option<String>,
    pub target_id: Option<String>,
    pub details: Option<Value>,
}

impl AuditLogRequest {
    pub fn new(operation: OperationType, target_table: &str) -> Self {
        Self {
            operation_type: Some(operation.as_str().to_string()),
            target_table: Some(target_table.to_string()),
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target_id: impl ToString) -> Self {
        self.target_id = Some(target_id.to_string());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// AuditLogResponse
///
/// `logId` is null when the audit table has not been provisioned yet.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuditLogResponse {
    pub success: bool,
    pub log_id: Option<Uuid>,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Credentials for `POST /api/login`. Missing fields deserialize as empty strings
/// and are rejected like any other wrong pair.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// GameRequest
///
/// Full payload for creating or replacing a game from the back office.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct GameRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub game_url: String,
    pub cover_url: Option<String>,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub is_featured: bool,
}

/// CategoryRequest
///
/// Payload for creating or renaming a category. The slug is derived from the
/// name when omitted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategoryRequest {
    #[serde(default)]
    pub name: String,
    pub slug: Option<String>,
}

/// CategoryInput
///
/// A validated category payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryInput {
    pub name: String,
    pub slug: String,
}

/// ViewRequest
///
/// Body of `POST /api/game-views`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ViewRequest {
    pub game_id: Option<Uuid>,
}

// --- Response Schemas (Output) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub success: bool,
}

/// MutationResponse
///
/// Result of a back-office mutation. The primary change has been committed;
/// `audit_warning` is set when the matching audit entry could not be written.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MutationResponse<T> {
    pub data: T,
    pub audit_warning: Option<String>,
}

/// GameDetail
///
/// A single game with up to four others from the same category.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct GameDetail {
    pub game: Game,
    pub related: Vec<Game>,
}

/// HomeFeed
///
/// Everything the landing page lists.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct HomeFeed {
    pub featured: Vec<Game>,
    pub games: Vec<Game>,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ViewRecorded {
    pub success: bool,
    pub views: i64,
}

/// ViewData
///
/// Either a single game's per-day history or the all-games trend.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ViewData {
    History(Vec<GameViewDay>),
    Trend(Vec<ViewTrendPoint>),
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ViewDataResponse {
    pub data: ViewData,
}

/// CatalogCounts
///
/// Aggregate counters computed by the store in one round trip.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CatalogCounts {
    pub total_games: i64,
    pub total_categories: i64,
    pub total_views: i64,
}

/// DashboardStats
///
/// Output schema for `GET /admin/dashboard`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DashboardStats {
    pub total_games: i64,
    pub total_categories: i64,
    pub total_views: i64,
    pub recent_games: Vec<Game>,
    pub top_games: Vec<Game>,
    pub views_trend: Vec<ViewTrendPoint>,
}
