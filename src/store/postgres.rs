//! PostgreSQL content store for production use.
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
//! - `DB_MIN_CONNECTIONS`: Minimum idle connections (default: 2)
//! - `DB_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//! - `DB_IDLE_TIMEOUT_SECS`: Idle connection timeout (default: 300)
//! - `DB_MAX_LIFETIME_SECS`: Max connection lifetime (default: 1800)
//!
//! ## Query composition
//!
//! Every read starts from [`PostgresContentStore::visible_query`], which emits
//! `deleted_at IS NULL` plus the bound visibility predicate, then appends the
//! method filter and finally `ORDER BY`/`LIMIT`/`OFFSET`. User input is only
//! ever bound, never interpolated.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::policy::VisibilityPolicy;
use crate::schema::SCHEMA_STATEMENTS;
use crate::types::{
    BadgeType, ClaimMode, Content, ContentError, ContentId, ContentType, QueryOptions,
    SearchFilters, TagCount, UserId, Viewer, ViewerProfile, Visibility,
};
use super::{escape_like, normalize_keyword, recent_cutoff, ContentStore, ViewerDirectory};

/// Columns selected for a content row over the `c` alias, URLs aggregated
/// in insertion order.
const CONTENT_COLUMNS: &str = r#"
    c.id, c.owner_id, c.title, c.description, c.content_type, c.visibility, c.tags,
    c.publish_date, c.capture_date, c.is_claimed, c.original_author, c.claimed_at,
    c.version, c.deleted_at, c.created_at, c.updated_at,
    COALESCE(
        (SELECT array_agg(u.url ORDER BY u.id) FROM content_urls u WHERE u.content_id = c.id),
        '{}'
    ) AS urls
"#;

/// Pool settings for the catalog database.
///
/// Catalog traffic is read-heavy list and search queries plus short
/// single-statement claims, so one connection is held only for the span of
/// one query. A bulk claim holds one connection at a time and runs its ids
/// sequentially, so the pool size bounds concurrent requests rather than
/// batch size.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum connections in pool (default: 10). Caps concurrent catalog
    /// requests against one database.
    pub max_connections: u32,
    /// Minimum idle connections to keep warm (default: 2), so the first
    /// listing after a quiet period does not pay a connect.
    pub min_connections: u32,
    /// Connection acquire timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds (default: 300 = 5 min).
    pub idle_timeout_secs: u64,
    /// Maximum connection lifetime in seconds (default: 1800 = 30 min).
    pub max_lifetime_secs: u64,
}

impl PostgresConfig {
    /// Load configuration from environment variables with production defaults.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/content_catalog".to_string()),
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: env_or("DB_MIN_CONNECTIONS", 2),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 300),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 1800),
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// `LIMIT`/`OFFSET` value; counts beyond `i64::MAX` saturate.
fn sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Pool statistics for monitoring.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolStats {
    /// Current pool size.
    pub size: u32,
    /// Number of idle connections.
    pub idle: usize,
    /// Maximum pool size.
    pub max: u32,
}

/// Error type for PostgreSQL store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(sqlx::Error),
    /// Unique, check or foreign-key constraint rejected the write.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    /// Target row absent or soft-deleted.
    #[error("Content not found: {0}")]
    ContentNotFound(ContentId),
    /// Row failed validation before reaching the database.
    #[error("Invalid content: {0}")]
    InvalidContent(#[from] ContentError),
}

impl From<sqlx::Error> for PostgresError {
    fn from(err: sqlx::Error) -> Self {
        let is_constraint = err.as_database_error().is_some_and(|db| {
            db.is_unique_violation() || db.is_check_violation() || db.is_foreign_key_violation()
        });
        if is_constraint {
            Self::ConstraintViolation(err.to_string())
        } else {
            Self::Database(err)
        }
    }
}

/// PostgreSQL content store.
///
/// Holds the injected connection pool; there is no global handle.
pub struct PostgresContentStore {
    pool: PgPool,
    policy: VisibilityPolicy,
}

impl PostgresContentStore {
    /// Create a new store with the given configuration.
    pub async fn new(config: PostgresConfig, policy: VisibilityPolicy) -> Result<Self, sqlx::Error> {
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            max_lifetime_secs = config.max_lifetime_secs,
            "Initializing PostgreSQL connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool, policy })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool, policy: VisibilityPolicy) -> Self {
        Self { pool, policy }
    }

    /// Create a store from environment variables.
    pub async fn from_env(policy: VisibilityPolicy) -> Result<Self, sqlx::Error> {
        Self::new(PostgresConfig::from_env(), policy).await
    }

    /// Get the connection pool for health checks.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if the database is reachable.
    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    /// Get pool statistics for monitoring.
    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max: self.pool.options().get_max_connections(),
        }
    }

    /// Create tables and indexes if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), PostgresError> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!(statements = SCHEMA_STATEMENTS.len(), "Content schema ensured");
        Ok(())
    }

    /// `SELECT ... FROM content c WHERE` soft-delete and visibility layers.
    fn visible_query(&self, viewer: &Viewer) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(CONTENT_COLUMNS);
        qb.push(" FROM content c WHERE c.deleted_at IS NULL");
        self.push_visibility(&mut qb, viewer);
        qb
    }

    /// `AND (owner match OR tier allowed)`, both sides bound.
    fn push_visibility(&self, qb: &mut QueryBuilder<'static, Postgres>, viewer: &Viewer) {
        let tiers: Vec<String> = self
            .policy
            .visible_tiers(viewer)
            .iter()
            .map(|t| t.as_str().to_string())
            .collect();

        qb.push(" AND (c.owner_id = ");
        qb.push_bind(viewer.id().map(|id| id.as_uuid()));
        qb.push(" OR c.visibility = ANY(");
        qb.push_bind(tiers);
        qb.push("))");
    }

    fn push_order_and_page(qb: &mut QueryBuilder<'static, Postgres>, options: &QueryOptions) {
        qb.push(" ORDER BY ");
        qb.push(options.sort.order_by_sql());
        if let Some(limit) = options.limit {
            qb.push(" LIMIT ");
            qb.push_bind(sql_count(limit));
        }
        if options.offset > 0 {
            qb.push(" OFFSET ");
            qb.push_bind(sql_count(options.offset));
        }
    }

    async fn fetch_contents(
        &self,
        mut qb: QueryBuilder<'static, Postgres>,
    ) -> Result<Vec<Content>, PostgresError> {
        tracing::debug!(sql = qb.sql(), "content query");
        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(Self::parse_content_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(PostgresError::from)
    }

    async fn fetch_page(
        &self,
        mut qb: QueryBuilder<'static, Postgres>,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, PostgresError> {
        Self::push_order_and_page(&mut qb, options);
        self.fetch_contents(qb).await
    }

    /// Fetch a row regardless of visibility, for use inside write paths.
    async fn fetch_raw<'e, E>(executor: E, id: &ContentId) -> Result<Option<Content>, PostgresError>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {CONTENT_COLUMNS} FROM content c WHERE c.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(executor)
            .await?;
        row.as_ref()
            .map(Self::parse_content_row)
            .transpose()
            .map_err(PostgresError::from)
    }

    /// Parse a content row.
    fn parse_content_row(row: &PgRow) -> Result<Content, sqlx::Error> {
        let id: Uuid = row.try_get("id")?;
        let owner_id: Option<Uuid> = row.try_get("owner_id")?;
        let content_type: String = row.try_get("content_type")?;
        let visibility: String = row.try_get("visibility")?;
        let tags: Vec<String> = row.try_get("tags")?;
        let urls: Vec<String> = row.try_get("urls")?;

        Ok(Content {
            id: ContentId::new(id),
            owner_id: owner_id.map(UserId::new),
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            content_type: ContentType::from_str(&content_type).unwrap_or_default(),
            visibility: Visibility::from_str(&visibility).unwrap_or_default(),
            tags: tags.into_iter().collect(),
            urls,
            publish_date: row.try_get("publish_date")?,
            capture_date: row.try_get("capture_date")?,
            is_claimed: row.try_get("is_claimed")?,
            original_author: row.try_get("original_author")?,
            claimed_at: row.try_get("claimed_at")?,
            version: row.try_get("version")?,
            deleted_at: row.try_get("deleted_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl ContentStore for PostgresContentStore {
    type Error = PostgresError;

    fn is_constraint_violation(error: &Self::Error) -> bool {
        matches!(
            error,
            PostgresError::ConstraintViolation(_) | PostgresError::InvalidContent(_)
        )
    }

    async fn find_by_user_id(
        &self,
        owner_id: &UserId,
        viewer: &Viewer,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, Self::Error> {
        let mut qb = self.visible_query(viewer);
        qb.push(" AND c.owner_id = ");
        qb.push_bind(owner_id.as_uuid());
        self.fetch_page(qb, options).await
    }

    async fn find_by_content_type(
        &self,
        content_type: ContentType,
        viewer: &Viewer,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, Self::Error> {
        let mut qb = self.visible_query(viewer);
        qb.push(" AND c.content_type = ");
        qb.push_bind(content_type.as_str());
        self.fetch_page(qb, options).await
    }

    async fn find_by_visibility(
        &self,
        visibility: Visibility,
        viewer: &Viewer,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, Self::Error> {
        let mut qb = self.visible_query(viewer);
        qb.push(" AND c.visibility = ");
        qb.push_bind(visibility.as_str());
        self.fetch_page(qb, options).await
    }

    async fn find_public_content(&self, options: &QueryOptions) -> Result<Vec<Content>, Self::Error> {
        let mut qb = self.visible_query(&Viewer::Anonymous);
        qb.push(" AND c.visibility = ");
        qb.push_bind(Visibility::Public.as_str());
        self.fetch_page(qb, options).await
    }

    async fn find_by_tags(
        &self,
        tags: &[String],
        viewer: &Viewer,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, Self::Error> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = self.visible_query(viewer);
        qb.push(" AND c.tags && ");
        qb.push_bind(tags.to_vec());
        self.fetch_page(qb, options).await
    }

    async fn find_by_id_for_viewer(
        &self,
        id: &ContentId,
        viewer: &Viewer,
    ) -> Result<Option<Content>, Self::Error> {
        let mut qb = self.visible_query(viewer);
        qb.push(" AND c.id = ");
        qb.push_bind(id.as_uuid());
        Ok(self.fetch_contents(qb).await?.into_iter().next())
    }

    async fn search_content(
        &self,
        keyword: &str,
        filters: &SearchFilters,
        viewer: &Viewer,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, Self::Error> {
        let Some(needle) = normalize_keyword(keyword) else {
            return Ok(Vec::new());
        };
        if filters.date_range.is_inverted() {
            return Ok(Vec::new());
        }
        let pattern = format!("%{}%", escape_like(&needle));

        let mut qb = self.visible_query(viewer);
        qb.push(" AND (c.title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR c.description ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR EXISTS (SELECT 1 FROM unnest(c.tags) AS t(tag) WHERE t.tag ILIKE ");
        qb.push_bind(pattern);
        qb.push(" ESCAPE '\\'))");

        if !filters.content_types.is_empty() {
            let types: Vec<String> = filters
                .content_types
                .iter()
                .map(|t| t.as_str().to_string())
                .collect();
            qb.push(" AND c.content_type = ANY(");
            qb.push_bind(types);
            qb.push(")");
        }
        if !filters.tags.is_empty() {
            let tags: Vec<String> = filters.tags.iter().cloned().collect();
            qb.push(" AND c.tags && ");
            qb.push_bind(tags);
        }
        if let Some(start) = filters.date_range.start {
            qb.push(" AND c.publish_date >= ");
            qb.push_bind(start);
        }
        if let Some(end) = filters.date_range.end {
            qb.push(" AND c.publish_date <= ");
            qb.push_bind(end);
        }

        self.fetch_page(qb, options).await
    }

    async fn find_recent_content(
        &self,
        days: u32,
        viewer: &Viewer,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, Self::Error> {
        let mut qb = self.visible_query(viewer);
        if let Some(cutoff) = recent_cutoff(Utc::now(), days) {
            qb.push(" AND c.created_at >= ");
            qb.push_bind(cutoff);
        }
        self.fetch_page(qb, options).await
    }

    async fn get_popular_tags(
        &self,
        viewer: &Viewer,
        limit: usize,
    ) -> Result<Vec<TagCount>, Self::Error> {
        let mut qb = QueryBuilder::new(
            "SELECT t.tag, COUNT(*) AS count \
             FROM content c CROSS JOIN LATERAL unnest(c.tags) AS t(tag) \
             WHERE c.deleted_at IS NULL",
        );
        self.push_visibility(&mut qb, viewer);
        qb.push(" GROUP BY t.tag ORDER BY count DESC, t.tag COLLATE \"C\" ASC LIMIT ");
        qb.push_bind(sql_count(limit));

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                let count: i64 = row.try_get("count")?;
                Ok(TagCount {
                    tag: row.try_get("tag")?,
                    count: count.max(0) as u64,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(PostgresError::from)
    }

    async fn find_visible(&self, viewer: &Viewer) -> Result<Vec<Content>, Self::Error> {
        let qb = self.visible_query(viewer);
        self.fetch_contents(qb).await
    }

    async fn find_unclaimed_by_author(
        &self,
        author: &str,
        viewer: &Viewer,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, Self::Error> {
        let Some(needle) = normalize_keyword(author) else {
            return Ok(Vec::new());
        };
        let mut qb = self.visible_query(viewer);
        qb.push(" AND c.is_claimed = FALSE AND LOWER(TRIM(c.original_author)) = ");
        qb.push_bind(needle);
        self.fetch_page(qb, options).await
    }

    async fn claim(
        &self,
        id: &ContentId,
        new_owner: &UserId,
        mode: ClaimMode,
    ) -> Result<Option<Content>, Self::Error> {
        // One statement: the WHERE clause is the compare, the SET is the swap.
        let guard = if mode.is_force() {
            ""
        } else {
            " AND is_claimed = FALSE"
        };
        let sql = format!(
            r#"
            WITH c AS (
                UPDATE content
                SET owner_id = $2,
                    is_claimed = TRUE,
                    claimed_at = NOW(),
                    version = version + 1,
                    updated_at = NOW()
                WHERE id = $1 AND deleted_at IS NULL{guard}
                RETURNING *
            )
            SELECT {CONTENT_COLUMNS} FROM c
            "#
        );

        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(new_owner.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref()
            .map(Self::parse_content_row)
            .transpose()
            .map_err(PostgresError::from)
    }

    async fn insert(&self, content: Content) -> Result<Content, Self::Error> {
        content.validate()?;

        let tags: Vec<String> = content.tags.iter().cloned().collect();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO content (
                id, owner_id, title, description, content_type, visibility, tags,
                publish_date, capture_date, is_claimed, original_author, claimed_at,
                version, deleted_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(content.id.as_uuid())
        .bind(content.owner_id.map(|o| o.as_uuid()))
        .bind(&content.title)
        .bind(&content.description)
        .bind(content.content_type.as_str())
        .bind(content.visibility.as_str())
        .bind(&tags)
        .bind(content.publish_date)
        .bind(content.capture_date)
        .bind(content.is_claimed)
        .bind(&content.original_author)
        .bind(content.claimed_at)
        .bind(content.version)
        .bind(content.deleted_at)
        .bind(content.created_at)
        .bind(content.updated_at)
        .execute(&mut *tx)
        .await?;

        for url in &content.urls {
            sqlx::query("INSERT INTO content_urls (content_id, url) VALUES ($1, $2)")
                .bind(content.id.as_uuid())
                .bind(url)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(content)
    }

    async fn add_url(&self, id: &ContentId, url: &str) -> Result<Content, Self::Error> {
        let mut tx = self.pool.begin().await?;

        let bumped = sqlx::query(
            r#"
            UPDATE content
            SET version = version + 1, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .execute(&mut *tx)
        .await?;
        if bumped.rows_affected() == 0 {
            return Err(PostgresError::ContentNotFound(*id));
        }

        sqlx::query("INSERT INTO content_urls (content_id, url) VALUES ($1, $2)")
            .bind(id.as_uuid())
            .bind(url)
            .execute(&mut *tx)
            .await?;

        let content = Self::fetch_raw(&mut *tx, id)
            .await?
            .ok_or(PostgresError::ContentNotFound(*id))?;
        tx.commit().await?;

        Ok(content)
    }

    async fn soft_delete(&self, id: &ContentId) -> Result<bool, Self::Error> {
        let result = sqlx::query(
            r#"
            UPDATE content
            SET deleted_at = NOW(), version = version + 1, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl ViewerDirectory for PostgresContentStore {
    type Error = PostgresError;

    async fn resolve_viewer(&self, user_id: Option<&UserId>) -> Result<Viewer, Self::Error> {
        let Some(user_id) = user_id else {
            return Ok(Viewer::Anonymous);
        };

        let row = sqlx::query(
            r#"
            SELECT u.id, u.is_admin, u.is_aws_employee,
                   COALESCE(
                       array_agg(b.badge_type) FILTER (WHERE b.badge_type IS NOT NULL),
                       '{}'
                   ) AS badges
            FROM users u
            LEFT JOIN user_badges b ON b.user_id = u.id AND b.is_active
            WHERE u.id = $1
            GROUP BY u.id
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(Viewer::Anonymous);
        };

        let badges: Vec<String> = row.try_get("badges")?;
        Ok(Viewer::User(ViewerProfile {
            id: *user_id,
            is_admin: row.try_get("is_admin")?,
            is_aws_employee: row.try_get("is_aws_employee")?,
            active_badges: badges.iter().filter_map(|b| BadgeType::from_str(b)).collect(),
        }))
    }
}
