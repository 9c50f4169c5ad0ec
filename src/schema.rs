//! Persisted shape of the catalog.
//!
//! Backend-agnostic DDL for the columns this crate reads and writes. The
//! Postgres store applies [`SCHEMA_STATEMENTS`] in order from
//! `ensure_schema`; other deployments can run them through their own
//! migration tooling.

/// Users and their roles.
pub const USERS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    username TEXT NOT NULL,
    is_admin BOOLEAN NOT NULL DEFAULT FALSE,
    is_aws_employee BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Badges granted to users. One row per (user, badge).
pub const USER_BADGES_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS user_badges (
    id BIGSERIAL PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    badge_type TEXT NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    awarded_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (user_id, badge_type)
)
"#;

/// Content rows. Unclaimed rows must carry an original author.
pub const CONTENT_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS content (
    id UUID PRIMARY KEY,
    owner_id UUID REFERENCES users(id),
    title TEXT NOT NULL,
    description TEXT,
    content_type TEXT NOT NULL,
    visibility TEXT NOT NULL CHECK (visibility IN ('private', 'aws_only', 'aws_community', 'public')),
    tags TEXT[] NOT NULL DEFAULT '{}',
    publish_date TIMESTAMPTZ,
    capture_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    is_claimed BOOLEAN NOT NULL DEFAULT TRUE,
    original_author TEXT,
    claimed_at TIMESTAMPTZ,
    version BIGINT NOT NULL DEFAULT 1 CHECK (version >= 1),
    deleted_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CHECK (is_claimed OR original_author IS NOT NULL)
)
"#;

/// External URLs, unique per content.
pub const CONTENT_URLS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS content_urls (
    id BIGSERIAL PRIMARY KEY,
    content_id UUID NOT NULL REFERENCES content(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (content_id, url)
)
"#;

/// Indexes backing the list queries.
pub const CONTENT_INDEXES: [&str; 4] = [
    "CREATE INDEX IF NOT EXISTS idx_content_owner ON content (owner_id) WHERE deleted_at IS NULL",
    "CREATE INDEX IF NOT EXISTS idx_content_publish_date ON content (publish_date DESC NULLS LAST) WHERE deleted_at IS NULL",
    "CREATE INDEX IF NOT EXISTS idx_content_tags ON content USING GIN (tags)",
    "CREATE INDEX IF NOT EXISTS idx_content_unclaimed ON content (LOWER(TRIM(original_author))) WHERE is_claimed = FALSE",
];

/// Every statement, in dependency order.
pub const SCHEMA_STATEMENTS: [&str; 8] = [
    USERS_TABLE_SCHEMA,
    USER_BADGES_TABLE_SCHEMA,
    CONTENT_TABLE_SCHEMA,
    CONTENT_URLS_TABLE_SCHEMA,
    CONTENT_INDEXES[0],
    CONTENT_INDEXES[1],
    CONTENT_INDEXES[2],
    CONTENT_INDEXES[3],
];
