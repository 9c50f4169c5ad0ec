//! In-memory content store for testing and embedded use.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::policy::VisibilityPolicy;
use crate::types::{
    ClaimMode, Content, ContentError, ContentId, ContentType, QueryOptions, SearchFilters,
    TagCount, UserId, Viewer, ViewerProfile, Visibility,
};
use super::{normalize_keyword, recent_cutoff, ContentStore, ViewerDirectory};

/// Error type for in-memory store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// Content not found (or soft-deleted).
    #[error("Content not found: {0}")]
    ContentNotFound(ContentId),
    /// URL already attached to the content.
    #[error("URL already exists on content {content_id}: {url}")]
    DuplicateUrl {
        /// Target content.
        content_id: ContentId,
        /// Repeated URL.
        url: String,
    },
    /// A row with this id already exists.
    #[error("Content already exists: {0}")]
    DuplicateContent(ContentId),
    /// Row violates a content invariant.
    #[error("Invalid content: {0}")]
    InvalidContent(#[from] ContentError),
}

/// In-memory content store.
///
/// Rows live in a `BTreeMap` behind a single `RwLock`; each mutation takes
/// the write lock for its whole check-and-update, which makes `claim` a
/// row-level compare-and-swap.
#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    rows: RwLock<BTreeMap<ContentId, Content>>,
    policy: VisibilityPolicy,
}

impl InMemoryContentStore {
    /// Create a new empty store with the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty store with an explicit policy.
    pub fn with_policy(policy: VisibilityPolicy) -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            policy,
        }
    }

    /// The visibility policy in force.
    pub fn policy(&self) -> &VisibilityPolicy {
        &self.policy
    }

    /// Get number of rows, including soft-deleted ones.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Check if the store holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Raw row access for tooling and tests. Bypasses visibility and
    /// soft-delete.
    pub fn get_raw(&self, id: &ContentId) -> Option<Content> {
        self.rows.read().get(id).cloned()
    }

    /// Rows passing soft-delete, visibility and `filter`, sorted and paginated.
    fn select<F>(&self, viewer: &Viewer, options: &QueryOptions, filter: F) -> Vec<Content>
    where
        F: Fn(&Content) -> bool,
    {
        let mut matched = self.select_unordered(viewer, filter);
        options.sort.sort(&mut matched);
        options.paginate(matched)
    }

    fn select_unordered<F>(&self, viewer: &Viewer, filter: F) -> Vec<Content>
    where
        F: Fn(&Content) -> bool,
    {
        self.rows
            .read()
            .values()
            .filter(|c| !c.is_deleted())
            .filter(|c| self.policy.allows(viewer, c))
            .filter(|c| filter(c))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    type Error = InMemoryError;

    fn is_constraint_violation(error: &Self::Error) -> bool {
        matches!(
            error,
            InMemoryError::DuplicateUrl { .. }
                | InMemoryError::DuplicateContent(_)
                | InMemoryError::InvalidContent(_)
        )
    }

    async fn find_by_user_id(
        &self,
        owner_id: &UserId,
        viewer: &Viewer,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, Self::Error> {
        Ok(self.select(viewer, options, |c| c.is_owned_by(owner_id)))
    }

    async fn find_by_content_type(
        &self,
        content_type: ContentType,
        viewer: &Viewer,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, Self::Error> {
        Ok(self.select(viewer, options, |c| c.content_type == content_type))
    }

    async fn find_by_visibility(
        &self,
        visibility: Visibility,
        viewer: &Viewer,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, Self::Error> {
        Ok(self.select(viewer, options, |c| c.visibility == visibility))
    }

    async fn find_public_content(&self, options: &QueryOptions) -> Result<Vec<Content>, Self::Error> {
        Ok(self.select(&Viewer::Anonymous, options, |c| {
            c.visibility == Visibility::Public
        }))
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
        Ok(self.select(viewer, options, |c| tags.iter().any(|t| c.tags.contains(t))))
    }

    async fn find_by_id_for_viewer(
        &self,
        id: &ContentId,
        viewer: &Viewer,
    ) -> Result<Option<Content>, Self::Error> {
        Ok(self
            .rows
            .read()
            .get(id)
            .filter(|c| !c.is_deleted() && self.policy.allows(viewer, c))
            .cloned())
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

        Ok(self.select(viewer, options, |c| {
            let hit = c.title.to_lowercase().contains(&needle)
                || c
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
                || c.tags.iter().any(|t| t.to_lowercase().contains(&needle));
            hit && filters.matches(c)
        }))
    }

    async fn find_recent_content(
        &self,
        days: u32,
        viewer: &Viewer,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, Self::Error> {
        let cutoff = recent_cutoff(Utc::now(), days);
        Ok(self.select(viewer, options, |c| {
            cutoff.map_or(true, |cutoff| c.created_at >= cutoff)
        }))
    }

    async fn get_popular_tags(
        &self,
        viewer: &Viewer,
        limit: usize,
    ) -> Result<Vec<TagCount>, Self::Error> {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for content in self.select_unordered(viewer, |_| true) {
            for tag in content.tags {
                *counts.entry(tag).or_default() += 1;
            }
        }

        let mut tags: Vec<TagCount> = counts
            .into_iter()
            .map(|(tag, count)| TagCount { tag, count })
            .collect();
        // Stable sort keeps the BTreeMap's lexical order among equal counts.
        tags.sort_by(|a, b| b.count.cmp(&a.count));
        tags.truncate(limit);

        Ok(tags)
    }

    async fn find_visible(&self, viewer: &Viewer) -> Result<Vec<Content>, Self::Error> {
        Ok(self.select_unordered(viewer, |_| true))
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
        Ok(self.select(viewer, options, |c| {
            !c.is_claimed
                && c
                    .original_author
                    .as_deref()
                    .is_some_and(|a| a.trim().to_lowercase() == needle)
        }))
    }

    async fn claim(
        &self,
        id: &ContentId,
        new_owner: &UserId,
        mode: ClaimMode,
    ) -> Result<Option<Content>, Self::Error> {
        let mut rows = self.rows.write();
        let Some(row) = rows.get_mut(id) else {
            return Ok(None);
        };
        if row.is_deleted() || (!mode.is_force() && row.is_claimed) {
            return Ok(None);
        }

        let now = Utc::now();
        row.owner_id = Some(*new_owner);
        row.is_claimed = true;
        row.claimed_at = Some(now);
        row.version += 1;
        row.updated_at = now;

        Ok(Some(row.clone()))
    }

    async fn insert(&self, content: Content) -> Result<Content, Self::Error> {
        content.validate()?;

        let mut rows = self.rows.write();
        if rows.contains_key(&content.id) {
            return Err(InMemoryError::DuplicateContent(content.id));
        }
        rows.insert(content.id, content.clone());

        Ok(content)
    }

    async fn add_url(&self, id: &ContentId, url: &str) -> Result<Content, Self::Error> {
        let mut rows = self.rows.write();
        let row = rows
            .get_mut(id)
            .filter(|c| !c.is_deleted())
            .ok_or(InMemoryError::ContentNotFound(*id))?;

        if row.urls.iter().any(|u| u == url) {
            return Err(InMemoryError::DuplicateUrl {
                content_id: *id,
                url: url.to_string(),
            });
        }

        row.urls.push(url.to_string());
        row.version += 1;
        row.updated_at = Utc::now();

        Ok(row.clone())
    }

    async fn soft_delete(&self, id: &ContentId) -> Result<bool, Self::Error> {
        let mut rows = self.rows.write();
        match rows.get_mut(id) {
            Some(row) if !row.is_deleted() => {
                let now = Utc::now();
                row.deleted_at = Some(now);
                row.version += 1;
                row.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// In-memory badge lookup.
#[derive(Debug, Default)]
pub struct InMemoryViewerDirectory {
    profiles: RwLock<HashMap<UserId, ViewerProfile>>,
}

impl InMemoryViewerDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a user's profile.
    pub fn upsert(&self, profile: ViewerProfile) {
        self.profiles.write().insert(profile.id, profile);
    }
}

#[async_trait]
impl ViewerDirectory for InMemoryViewerDirectory {
    type Error = std::convert::Infallible;

    async fn resolve_viewer(&self, user_id: Option<&UserId>) -> Result<Viewer, Self::Error> {
        Ok(user_id
            .and_then(|id| self.profiles.read().get(id).cloned())
            .map(Viewer::User)
            .unwrap_or(Viewer::Anonymous))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BadgeType, DateRange, SortField, SortOption, SortOrder};
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn make_content(id: u128, owner: UserId, title: &str, visibility: Visibility) -> Content {
        Content::new(owner, title, ContentType::Blog, visibility)
            .with_id(ContentId::new(Uuid::from_u128(id)))
    }

    #[tokio::test]
    async fn test_insert_and_find_by_id() {
        let store = InMemoryContentStore::new();
        let owner = UserId::random();
        let content = make_content(1, owner, "Hello", Visibility::Public);
        let id = content.id;

        store.insert(content).await.unwrap();

        let found = store.find_by_id_for_viewer(&id, &Viewer::Anonymous).await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(id));
    }

    #[tokio::test]
    async fn test_restricted_and_absent_look_the_same() {
        let store = InMemoryContentStore::new();
        let owner = UserId::random();
        let content = make_content(1, owner, "Secret", Visibility::Private);
        let id = content.id;
        store.insert(content).await.unwrap();

        let stranger = Viewer::user(UserId::random());
        let restricted = store.find_by_id_for_viewer(&id, &stranger).await.unwrap();
        let absent = store
            .find_by_id_for_viewer(&ContentId::new(Uuid::from_u128(99)), &stranger)
            .await
            .unwrap();
        assert_eq!(restricted, absent);
        assert!(store.find_by_id_for_viewer(&id, &Viewer::user(owner)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_soft_deleted_rows_are_hidden_everywhere() {
        let store = InMemoryContentStore::new();
        let owner = UserId::random();
        let content = make_content(1, owner, "Gone", Visibility::Public).with_tags(["aws"]);
        let id = content.id;
        store.insert(content).await.unwrap();

        assert!(store.soft_delete(&id).await.unwrap());
        assert!(!store.soft_delete(&id).await.unwrap());

        let admin = Viewer::admin(UserId::random());
        assert!(store.find_by_id_for_viewer(&id, &admin).await.unwrap().is_none());
        assert!(store.find_by_user_id(&owner, &admin, &QueryOptions::all()).await.unwrap().is_empty());
        assert!(store.get_popular_tags(&admin, 10).await.unwrap().is_empty());
        assert!(store.claim(&id, &UserId::random(), ClaimMode::Force).await.unwrap().is_none());
        assert_eq!(store.get_raw(&id).unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_find_by_user_id_respects_visibility() {
        let store = InMemoryContentStore::new();
        let owner = UserId::random();
        store.insert(make_content(1, owner, "Public", Visibility::Public)).await.unwrap();
        store.insert(make_content(2, owner, "Private", Visibility::Private)).await.unwrap();

        let own = store
            .find_by_user_id(&owner, &Viewer::user(owner), &QueryOptions::all())
            .await
            .unwrap();
        assert_eq!(own.len(), 2);

        let anon = store
            .find_by_user_id(&owner, &Viewer::Anonymous, &QueryOptions::all())
            .await
            .unwrap();
        assert_eq!(anon.len(), 1);
        assert_eq!(anon[0].title, "Public");
    }

    #[tokio::test]
    async fn test_search_is_literal_and_case_insensitive() {
        let store = InMemoryContentStore::new();
        let owner = UserId::random();
        store
            .insert(make_content(1, owner, "Serverless with LAMBDA", Visibility::Public))
            .await
            .unwrap();
        store
            .insert(
                make_content(2, owner, "Containers", Visibility::Public)
                    .with_description("Running lambda-like jobs on ECS"),
            )
            .await
            .unwrap();
        store
            .insert(make_content(3, owner, "Networking", Visibility::Public).with_tags(["Lambda"]))
            .await
            .unwrap();

        let filters = SearchFilters::default();
        let hits = store
            .search_content("lambda", &filters, &Viewer::Anonymous, &QueryOptions::all())
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);

        let none = store
            .search_content("%", &filters, &Viewer::Anonymous, &QueryOptions::all())
            .await
            .unwrap();
        assert!(none.is_empty());

        let empty = store
            .search_content("  ", &filters, &Viewer::Anonymous, &QueryOptions::all())
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_search_filters() {
        let store = InMemoryContentStore::new();
        let owner = UserId::random();
        let jan = |d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
        store
            .insert(
                make_content(1, owner, "Lambda basics", Visibility::Public)
                    .with_tags(["serverless"])
                    .with_publish_date(jan(5)),
            )
            .await
            .unwrap();
        let mut video = make_content(2, owner, "Lambda video", Visibility::Public)
            .with_publish_date(jan(20));
        video.content_type = ContentType::Youtube;
        store.insert(video).await.unwrap();

        let by_type = SearchFilters::default().with_content_type(ContentType::Youtube);
        let hits = store
            .search_content("lambda", &by_type, &Viewer::Anonymous, &QueryOptions::all())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Lambda video");

        let by_tag = SearchFilters::default().with_tag("serverless");
        let hits = store
            .search_content("lambda", &by_tag, &Viewer::Anonymous, &QueryOptions::all())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Lambda basics");

        let window = SearchFilters::default().with_date_range(DateRange::between(jan(1), jan(5)));
        let hits = store
            .search_content("lambda", &window, &Viewer::Anonymous, &QueryOptions::all())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let inverted = SearchFilters::default().with_date_range(DateRange::between(jan(10), jan(1)));
        let hits = store
            .search_content("lambda", &inverted, &Viewer::Anonymous, &QueryOptions::all())
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_popular_tags_ordering() {
        let store = InMemoryContentStore::new();
        let owner = UserId::random();
        store.insert(make_content(1, owner, "a", Visibility::Public).with_tags(["lambda", "aws"])).await.unwrap();
        store.insert(make_content(2, owner, "b", Visibility::Public).with_tags(["lambda", "s3"])).await.unwrap();
        store.insert(make_content(3, owner, "c", Visibility::Private).with_tags(["secret"])).await.unwrap();

        let tags = store.get_popular_tags(&Viewer::Anonymous, 10).await.unwrap();
        let pairs: Vec<_> = tags.iter().map(|t| (t.tag.as_str(), t.count)).collect();
        assert_eq!(pairs, vec![("lambda", 2), ("aws", 1), ("s3", 1)]);

        let top = store.get_popular_tags(&Viewer::Anonymous, 1).await.unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn test_recent_content() {
        let store = InMemoryContentStore::new();
        let owner = UserId::random();
        store.insert(make_content(1, owner, "new", Visibility::Public)).await.unwrap();
        store
            .insert(
                make_content(2, owner, "old", Visibility::Public)
                    .with_created_at(Utc::now() - Duration::days(30)),
            )
            .await
            .unwrap();

        let recent = store
            .find_recent_content(7, &Viewer::Anonymous, &QueryOptions::all())
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].title, "new");
    }

    #[tokio::test]
    async fn test_recent_content_unbounded_window() {
        let store = InMemoryContentStore::new();
        let owner = UserId::random();
        store.insert(make_content(1, owner, "new", Visibility::Public)).await.unwrap();
        store
            .insert(
                make_content(2, owner, "ancient", Visibility::Public)
                    .with_created_at(Utc::now() - Duration::days(365 * 50)),
            )
            .await
            .unwrap();
        store.insert(make_content(3, owner, "hidden", Visibility::Private)).await.unwrap();

        let all = store
            .find_recent_content(u32::MAX, &Viewer::Anonymous, &QueryOptions::all())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|c| c.visibility == Visibility::Public));
    }

    #[tokio::test]
    async fn test_add_url_uniqueness() {
        let store = InMemoryContentStore::new();
        let content = make_content(1, UserId::random(), "a", Visibility::Public);
        let id = content.id;
        store.insert(content).await.unwrap();

        let updated = store.add_url(&id, "https://example.com").await.unwrap();
        assert_eq!(updated.version, 2);

        let err = store.add_url(&id, "https://example.com").await.unwrap_err();
        assert!(InMemoryContentStore::is_constraint_violation(&err));
    }

    #[tokio::test]
    async fn test_insert_rejects_unclaimed_without_author() {
        let store = InMemoryContentStore::new();
        let mut content = Content::unclaimed("Jane", "a", ContentType::Blog, Visibility::Public);
        content.original_author = None;

        let err = store.insert(content).await.unwrap_err();
        assert!(matches!(err, InMemoryError::InvalidContent(_)));
    }

    #[tokio::test]
    async fn test_insert_rejects_non_positive_version() {
        let store = InMemoryContentStore::new();
        let mut content = make_content(1, UserId::random(), "v0", Visibility::Public);
        content.version = 0;
        let id = content.id;

        let err = store.insert(content).await.unwrap_err();
        assert!(matches!(
            err,
            InMemoryError::InvalidContent(ContentError::InvalidVersion { version: 0, .. })
        ));
        assert!(InMemoryContentStore::is_constraint_violation(&err));
        assert!(store.get_raw(&id).is_none());
    }

    #[tokio::test]
    async fn test_find_unclaimed_by_author() {
        let store = InMemoryContentStore::new();
        store
            .insert(Content::unclaimed("Jane Doe", "a", ContentType::Blog, Visibility::Public))
            .await
            .unwrap();
        store
            .insert(Content::unclaimed("John", "b", ContentType::Blog, Visibility::Public))
            .await
            .unwrap();

        let found = store
            .find_unclaimed_by_author("jane doe", &Viewer::Anonymous, &QueryOptions::all())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "a");
    }

    #[tokio::test]
    async fn test_type_tier_and_tag_listings() {
        let store = InMemoryContentStore::new();
        let owner = UserId::random();
        store
            .insert(make_content(1, owner, "Blog post", Visibility::Public).with_tags(["aws", "lambda"]))
            .await
            .unwrap();
        store
            .insert(
                Content::new(owner, "Talk", ContentType::ConferenceTalk, Visibility::AwsOnly)
                    .with_id(ContentId::new(Uuid::from_u128(2)))
                    .with_tags(["lambda"]),
            )
            .await
            .unwrap();

        let employee = Viewer::aws_employee(UserId::random());
        let all = QueryOptions::all();

        let talks = store.find_by_content_type(ContentType::ConferenceTalk, &employee, &all).await.unwrap();
        assert_eq!(talks.len(), 1);
        assert!(store
            .find_by_content_type(ContentType::ConferenceTalk, &Viewer::Anonymous, &all)
            .await
            .unwrap()
            .is_empty());

        let aws_only = store.find_by_visibility(Visibility::AwsOnly, &employee, &all).await.unwrap();
        assert_eq!(aws_only.len(), 1);
        assert_eq!(store.find_public_content(&all).await.unwrap().len(), 1);

        let lambda = store.find_by_tags(&["lambda".to_string()], &employee, &all).await.unwrap();
        assert_eq!(lambda.len(), 2);
        assert!(store.find_by_tags(&[], &employee, &all).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sort_and_paginate() {
        let store = InMemoryContentStore::new();
        let owner = UserId::random();
        let day = |d| Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap();
        store.insert(make_content(1, owner, "banana", Visibility::Public).with_publish_date(day(2))).await.unwrap();
        store.insert(make_content(2, owner, "Apple", Visibility::Public).with_publish_date(day(9))).await.unwrap();
        store.insert(make_content(3, owner, "cherry", Visibility::Public)).await.unwrap();

        let titles = |items: Vec<Content>| items.into_iter().map(|c| c.title).collect::<Vec<_>>();

        let by_date = store.find_public_content(&QueryOptions::all()).await.unwrap();
        assert_eq!(titles(by_date), vec!["Apple", "banana", "cherry"]);

        let by_title = QueryOptions::all().sorted_by(SortOption::new(SortField::Title, SortOrder::Asc));
        let sorted = store.find_public_content(&by_title).await.unwrap();
        assert_eq!(titles(sorted), vec!["Apple", "banana", "cherry"]);

        let page = store.find_public_content(&QueryOptions::page(1, 1)).await.unwrap();
        assert_eq!(titles(page), vec!["banana"]);
        assert!(store.find_public_content(&QueryOptions::page(5, 10)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_viewer_directory() {
        let directory = InMemoryViewerDirectory::new();
        let id = UserId::random();
        directory.upsert(ViewerProfile {
            id,
            is_admin: false,
            is_aws_employee: true,
            active_badges: [BadgeType::Hero].into_iter().collect(),
        });

        let viewer = directory.resolve_viewer(Some(&id)).await.unwrap();
        assert!(viewer.is_aws_employee());
        assert_eq!(
            directory.resolve_viewer(Some(&UserId::random())).await.unwrap(),
            Viewer::Anonymous
        );
        assert_eq!(directory.resolve_viewer(None).await.unwrap(), Viewer::Anonymous);
    }
}
