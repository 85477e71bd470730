use crate::{
    error::StoreError,
    models::{
        AuditLogEntry, CatalogCounts, Category, CategoryInput, Game, GameRequest, GameViewDay,
        NewAuditEntry, ViewTrendPoint,
    },
};
use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

/// GameOrder
///
/// Sort order for game listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameOrder {
    #[default]
    Newest,
    MostViewed,
}

/// GameFilter
///
/// Every game listing (home feed, catalog, back office, dashboard) is a
/// combination of these filters.
#[derive(Debug, Clone, Default)]
pub struct GameFilter {
    pub category_id: Option<Uuid>,
    pub featured_only: bool,
    // Case-insensitive match on the title or the category name.
    pub search: Option<String>,
    pub order: GameOrder,
    pub limit: Option<i64>,
}

impl GameFilter {
    pub fn newest(limit: i64) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn most_viewed(limit: Option<i64>) -> Self {
        Self {
            order: GameOrder::MostViewed,
            limit,
            ..Self::default()
        }
    }
}

/// Repository Trait
///
/// The contract for every call into the hosted data store. Handlers and the audit
/// recorder only see this trait, so tests swap in an in-memory implementation.
///
/// Every method reports store failures as `StoreError`; deciding whether a failure
/// is fatal belongs to the caller.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Catalog Reads ---
    async fn list_games(&self, filter: GameFilter) -> Result<Vec<Game>, StoreError>;
    async fn get_game(&self, id: Uuid) -> Result<Option<Game>, StoreError>;
    // Same category, excluding `exclude`.
    async fn related_games(
        &self,
        category_id: Uuid,
        exclude: Uuid,
        limit: i64,
    ) -> Result<Vec<Game>, StoreError>;
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError>;
    async fn get_counts(&self) -> Result<CatalogCounts, StoreError>;

    // --- Game Mutations ---
    async fn create_game(&self, req: GameRequest) -> Result<Game, StoreError>;
    async fn update_game(&self, id: Uuid, req: GameRequest) -> Result<Option<Game>, StoreError>;
    // Returns true if a row was removed.
    async fn delete_game(&self, id: Uuid) -> Result<bool, StoreError>;

    // --- Category Mutations ---
    async fn create_category(&self, input: CategoryInput) -> Result<Category, StoreError>;
    async fn update_category(
        &self,
        id: Uuid,
        input: CategoryInput,
    ) -> Result<Option<Category>, StoreError>;
    async fn delete_category(&self, id: Uuid) -> Result<bool, StoreError>;

    // --- View Tracking ---
    // Atomic +1; returns the new counter, or None when the game does not exist.
    async fn increment_game_views(&self, id: Uuid) -> Result<Option<i64>, StoreError>;
    // Adds one view to today's aggregate row for the game.
    async fn append_daily_view(&self, id: Uuid) -> Result<(), StoreError>;
    async fn game_view_history(&self, id: Uuid) -> Result<Vec<GameViewDay>, StoreError>;
    async fn views_trend(&self, days: i32) -> Result<Vec<ViewTrendPoint>, StoreError>;

    // --- Operation Log ---
    async fn insert_audit_entry(&self, entry: NewAuditEntry) -> Result<Uuid, StoreError>;
    async fn recent_audit_entries(&self, limit: i64) -> Result<Vec<AuditLogEntry>, StoreError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by the hosted Postgres database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const GAME_COLUMNS: &str = r#"
    g.id, g.title, g.description, g.game_url, g.cover_url, g.category_id,
    g.is_featured, g.views, g.created_at, c.name AS category_name
"#;

const CATEGORY_WITH_COUNT: &str = r#"
    SELECT c.id, c.name, c.slug, c.created_at, COUNT(g.id) AS games_count
    FROM categories c
    LEFT JOIN games g ON g.category_id = c.id
"#;

#[async_trait]
impl Repository for PostgresRepository {
    /// list_games
    ///
    /// Builds the listing with QueryBuilder so every user-supplied value is bound.
    async fn list_games(&self, filter: GameFilter) -> Result<Vec<Game>, StoreError> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new("SELECT ");
        builder.push(GAME_COLUMNS);
        builder.push(" FROM games g LEFT JOIN categories c ON c.id = g.category_id WHERE TRUE");

        if let Some(category_id) = filter.category_id {
            builder.push(" AND g.category_id = ");
            builder.push_bind(category_id);
        }

        if filter.featured_only {
            builder.push(" AND g.is_featured = true");
        }

        if let Some(search) = filter.search.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            builder.push(" AND (g.title ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR c.name ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        match filter.order {
            GameOrder::Newest => builder.push(" ORDER BY g.created_at DESC"),
            GameOrder::MostViewed => builder.push(" ORDER BY g.views DESC, g.created_at DESC"),
        };

        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }

        let games = builder
            .build_query_as::<Game>()
            .fetch_all(&self.pool)
            .await?;
        Ok(games)
    }

    async fn get_game(&self, id: Uuid) -> Result<Option<Game>, StoreError> {
        let sql = format!(
            "SELECT {GAME_COLUMNS} FROM games g LEFT JOIN categories c ON c.id = g.category_id WHERE g.id = $1"
        );
        let game = sqlx::query_as::<_, Game>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(game)
    }

    async fn related_games(
        &self,
        category_id: Uuid,
        exclude: Uuid,
        limit: i64,
    ) -> Result<Vec<Game>, StoreError> {
        let sql = format!(
            r#"SELECT {GAME_COLUMNS}
               FROM games g LEFT JOIN categories c ON c.id = g.category_id
               WHERE g.category_id = $1 AND g.id <> $2
               ORDER BY g.views DESC
               LIMIT $3"#
        );
        let games = sqlx::query_as::<_, Game>(&sql)
            .bind(category_id)
            .bind(exclude)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(games)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let sql = format!("{CATEGORY_WITH_COUNT} GROUP BY c.id ORDER BY c.name");
        let categories = sqlx::query_as::<_, Category>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        let sql = format!("{CATEGORY_WITH_COUNT} WHERE c.id = $1 GROUP BY c.id");
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    /// get_counts
    ///
    /// Compiles the dashboard counters in a single round trip.
    async fn get_counts(&self) -> Result<CatalogCounts, StoreError> {
        let counts = sqlx::query_as::<_, CatalogCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM games) AS total_games,
                (SELECT COUNT(*) FROM categories) AS total_categories,
                (SELECT COALESCE(SUM(views), 0)::BIGINT FROM games) AS total_views
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }

    /// create_game
    ///
    /// Inserts and re-selects through a CTE so the joined category name comes back
    /// in the same statement.
    async fn create_game(&self, req: GameRequest) -> Result<Game, StoreError> {
        let game = sqlx::query_as::<_, Game>(
            r#"
            WITH inserted AS (
                INSERT INTO games (title, description, game_url, cover_url, category_id, is_featured)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            )
            SELECT i.id, i.title, i.description, i.game_url, i.cover_url, i.category_id,
                   i.is_featured, i.views, i.created_at, c.name AS category_name
            FROM inserted i LEFT JOIN categories c ON c.id = i.category_id
            "#,
        )
        .bind(req.title)
        .bind(req.description)
        .bind(req.game_url)
        .bind(req.cover_url)
        .bind(req.category_id)
        .bind(req.is_featured)
        .fetch_one(&self.pool)
        .await?;
        Ok(game)
    }

    async fn update_game(&self, id: Uuid, req: GameRequest) -> Result<Option<Game>, StoreError> {
        let game = sqlx::query_as::<_, Game>(
            r#"
            WITH updated AS (
                UPDATE games
                SET title = $2, description = $3, game_url = $4, cover_url = $5,
                    category_id = $6, is_featured = $7
                WHERE id = $1
                RETURNING *
            )
            SELECT u.id, u.title, u.description, u.game_url, u.cover_url, u.category_id,
                   u.is_featured, u.views, u.created_at, c.name AS category_name
            FROM updated u LEFT JOIN categories c ON c.id = u.category_id
            "#,
        )
        .bind(id)
        .bind(req.title)
        .bind(req.description)
        .bind(req.game_url)
        .bind(req.cover_url)
        .bind(req.category_id)
        .bind(req.is_featured)
        .fetch_optional(&self.pool)
        .await?;
        Ok(game)
    }

    async fn delete_game(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM games WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_category(&self, input: CategoryInput) -> Result<Category, StoreError> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            WITH inserted AS (
                INSERT INTO categories (name, slug) VALUES ($1, $2)
                RETURNING id, name, slug, created_at
            )
            SELECT i.id, i.name, i.slug, i.created_at, 0::BIGINT AS games_count
            FROM inserted i
            "#,
        )
        .bind(input.name)
        .bind(input.slug)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn update_category(
        &self,
        id: Uuid,
        input: CategoryInput,
    ) -> Result<Option<Category>, StoreError> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            WITH updated AS (
                UPDATE categories SET name = $2, slug = $3 WHERE id = $1
                RETURNING id, name, slug, created_at
            )
            SELECT u.id, u.name, u.slug, u.created_at,
                   (SELECT COUNT(*) FROM games g WHERE g.category_id = u.id) AS games_count
            FROM updated u
            "#,
        )
        .bind(id)
        .bind(input.name)
        .bind(input.slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// increment_game_views
    ///
    /// Single-statement increment; concurrent views never lose an update.
    async fn increment_game_views(&self, id: Uuid) -> Result<Option<i64>, StoreError> {
        let views = sqlx::query_scalar::<_, i64>(
            "UPDATE games SET views = views + 1 WHERE id = $1 RETURNING views",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(views)
    }

    async fn append_daily_view(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO game_views (game_id, view_date, view_count)
            VALUES ($1, CURRENT_DATE, 1)
            ON CONFLICT (game_id, view_date)
            DO UPDATE SET view_count = game_views.view_count + 1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn game_view_history(&self, id: Uuid) -> Result<Vec<GameViewDay>, StoreError> {
        let days = sqlx::query_as::<_, GameViewDay>(
            "SELECT game_id, view_date, view_count FROM game_views WHERE game_id = $1 ORDER BY view_date DESC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(days)
    }

    /// views_trend
    ///
    /// Per-day totals for the last `days` days, oldest first.
    async fn views_trend(&self, days: i32) -> Result<Vec<ViewTrendPoint>, StoreError> {
        let points = sqlx::query_as::<_, ViewTrendPoint>(
            r#"
            SELECT view_date, SUM(view_count)::BIGINT AS total_views
            FROM game_views
            WHERE view_date > CURRENT_DATE - $1::INT
            GROUP BY view_date
            ORDER BY view_date ASC
            "#,
        )
        .bind(days)
        .fetch_all(&self.pool)
        .await?;
        Ok(points)
    }

    async fn insert_audit_entry(&self, entry: NewAuditEntry) -> Result<Uuid, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO operation_logs (user_id, operation_type, target_table, target_id, details, ip_address)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.operation_type.as_str())
        .bind(entry.target_table)
        .bind(entry.target_id)
        .bind(entry.details)
        .bind(entry.ip_address)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn recent_audit_entries(&self, limit: i64) -> Result<Vec<AuditLogEntry>, StoreError> {
        let entries = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT id, user_id, operation_type, target_table, target_id, details, ip_address, created_at
            FROM operation_logs
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
