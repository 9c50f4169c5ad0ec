//! Content records and their identifiers.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a content item.
///
/// Wraps a UUID and implements `Ord` so it can serve as the final
/// tie-break in every ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentId(Uuid);

impl ContentId {
    /// Create a new ContentId from a UUID.
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Create a new ContentId from a UUID string.
    pub fn from_str(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Generate a fresh random id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ContentId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Unique identifier for a user (owner or viewer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Create a new UserId from a UUID.
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Create a new UserId from a UUID string.
    pub fn from_str(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Generate a fresh random id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Kind of content in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Blog post or article.
    Blog,
    /// Video on YouTube.
    Youtube,
    /// GitHub repository.
    Github,
    /// Recorded conference talk.
    ConferenceTalk,
    /// Podcast episode.
    Podcast,
    /// Social media post.
    Social,
    /// Whitepaper.
    Whitepaper,
    /// Step-by-step tutorial.
    Tutorial,
    /// Hands-on workshop.
    Workshop,
    /// Book or book chapter.
    Book,
}

impl ContentType {
    /// Every content type, in declaration order.
    pub const ALL: [ContentType; 10] = [
        Self::Blog,
        Self::Youtube,
        Self::Github,
        Self::ConferenceTalk,
        Self::Podcast,
        Self::Social,
        Self::Whitepaper,
        Self::Tutorial,
        Self::Workshop,
        Self::Book,
    ];

    /// Parse content type from its stored string form.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "blog" => Some(Self::Blog),
            "youtube" => Some(Self::Youtube),
            "github" => Some(Self::Github),
            "conference_talk" => Some(Self::ConferenceTalk),
            "podcast" => Some(Self::Podcast),
            "social" => Some(Self::Social),
            "whitepaper" => Some(Self::Whitepaper),
            "tutorial" => Some(Self::Tutorial),
            "workshop" => Some(Self::Workshop),
            "book" => Some(Self::Book),
            _ => None,
        }
    }

    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blog => "blog",
            Self::Youtube => "youtube",
            Self::Github => "github",
            Self::ConferenceTalk => "conference_talk",
            Self::Podcast => "podcast",
            Self::Social => "social",
            Self::Whitepaper => "whitepaper",
            Self::Tutorial => "tutorial",
            Self::Workshop => "workshop",
            Self::Book => "book",
        }
    }
}

impl Default for ContentType {
    fn default() -> Self {
        Self::Blog
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visibility tier controlling who may read a content item.
///
/// Tiers are ordered from most restricted to most open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Owner and admins only.
    Private,
    /// AWS employees.
    AwsOnly,
    /// AWS employees and holders of a community-eligible badge.
    AwsCommunity,
    /// Everyone, including anonymous viewers.
    Public,
}

impl Visibility {
    /// Every tier, most restricted first.
    pub const ALL: [Visibility; 4] = [
        Self::Private,
        Self::AwsOnly,
        Self::AwsCommunity,
        Self::Public,
    ];

    /// Parse a tier from its stored string form.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "private" => Some(Self::Private),
            "aws_only" => Some(Self::AwsOnly),
            "aws_community" => Some(Self::AwsCommunity),
            "public" => Some(Self::Public),
            _ => None,
        }
    }

    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::AwsOnly => "aws_only",
            Self::AwsCommunity => "aws_community",
            Self::Public => "public",
        }
    }
}

// Unknown tiers decode as private so a bad row is never over-exposed.
impl Default for Visibility {
    fn default() -> Self {
        Self::Private
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row-level invariant violations on a content record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    /// Unclaimed content must name its original author.
    #[error("Unclaimed content {0} has no original author")]
    MissingOriginalAuthor(ContentId),
    /// The same URL appears twice on one content item.
    #[error("Duplicate URL on content {content_id}: {url}")]
    DuplicateUrl {
        /// Content carrying the duplicate.
        content_id: ContentId,
        /// The repeated URL.
        url: String,
    },
    /// Versions start at 1.
    #[error("Content {content_id} has invalid version {version}")]
    InvalidVersion {
        /// Offending content.
        content_id: ContentId,
        /// The stored version.
        version: i64,
    },
}

/// A catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Unique content identifier.
    pub id: ContentId,
    /// Current owner; `None` until the item is claimed.
    pub owner_id: Option<UserId>,
    /// Title.
    pub title: String,
    /// Optional long-form description.
    pub description: Option<String>,
    /// Kind of content.
    pub content_type: ContentType,
    /// Visibility tier.
    pub visibility: Visibility,
    /// Tags (order irrelevant).
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// External URLs, unique within this item, in insertion order.
    #[serde(default)]
    pub urls: Vec<String>,
    /// When the content was published at its source.
    pub publish_date: Option<DateTime<Utc>>,
    /// When the content was captured into the catalog.
    pub capture_date: DateTime<Utc>,
    /// Whether ownership has been claimed.
    pub is_claimed: bool,
    /// Author name recorded at ingestion; required while unclaimed.
    pub original_author: Option<String>,
    /// When the most recent claim happened.
    pub claimed_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency version, starts at 1.
    pub version: i64,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Content {
    /// Create claimed content owned by `owner_id`.
    pub fn new(
        owner_id: UserId,
        title: impl Into<String>,
        content_type: ContentType,
        visibility: Visibility,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ContentId::random(),
            owner_id: Some(owner_id),
            title: title.into(),
            description: None,
            content_type,
            visibility,
            tags: BTreeSet::new(),
            urls: Vec::new(),
            publish_date: None,
            capture_date: now,
            is_claimed: true,
            original_author: None,
            claimed_at: None,
            version: 1,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create unclaimed content attributed to `original_author`.
    pub fn unclaimed(
        original_author: impl Into<String>,
        title: impl Into<String>,
        content_type: ContentType,
        visibility: Visibility,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ContentId::random(),
            owner_id: None,
            title: title.into(),
            description: None,
            content_type,
            visibility,
            tags: BTreeSet::new(),
            urls: Vec::new(),
            publish_date: None,
            capture_date: now,
            is_claimed: false,
            original_author: Some(original_author.into()),
            claimed_at: None,
            version: 1,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set an explicit id.
    pub fn with_id(mut self, id: ContentId) -> Self {
        self.id = id;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add tags.
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Append a URL. Repeats are kept so `validate` can report them.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.urls.push(url.into());
        self
    }

    /// Set the publish date.
    pub fn with_publish_date(mut self, publish_date: DateTime<Utc>) -> Self {
        self.publish_date = Some(publish_date);
        self
    }

    /// Set the creation timestamp.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = created_at;
        self
    }

    /// Whether the item has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether `user` owns this item.
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.owner_id.as_ref() == Some(user)
    }

    /// Check row-level invariants.
    pub fn validate(&self) -> Result<(), ContentError> {
        if self.version < 1 {
            return Err(ContentError::InvalidVersion {
                content_id: self.id,
                version: self.version,
            });
        }
        if !self.is_claimed && self.original_author.is_none() {
            return Err(ContentError::MissingOriginalAuthor(self.id));
        }

        let mut seen = BTreeSet::new();
        for url in &self.urls {
            if !seen.insert(url.as_str()) {
                return Err(ContentError::DuplicateUrl {
                    content_id: self.id,
                    url: url.clone(),
                });
            }
        }

        Ok(())
    }
}
