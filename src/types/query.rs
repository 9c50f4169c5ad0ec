//! Query options shared by every list method: sort, filters, pagination.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::content::{Content, ContentType};

/// Field a list is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Publish date (items without one sort last).
    Date,
    /// Title, case-insensitive.
    Title,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Smallest first.
    Asc,
    /// Largest first.
    Desc,
}

/// Sort option for list endpoints. Defaults to date descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOption {
    /// Field to sort by.
    pub field: SortField,
    /// Direction.
    pub order: SortOrder,
}

impl SortOption {
    /// Create a sort option.
    pub fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    /// Newest first.
    pub fn date_desc() -> Self {
        Self::new(SortField::Date, SortOrder::Desc)
    }

    /// Compare two items under this option.
    ///
    /// Missing publish dates sort last in either direction; ties fall
    /// back to `ContentId` so the order is total.
    pub fn compare(&self, a: &Content, b: &Content) -> Ordering {
        let primary = match self.field {
            SortField::Date => match (a.publish_date, b.publish_date) {
                (Some(x), Some(y)) => match self.order {
                    SortOrder::Asc => x.cmp(&y),
                    SortOrder::Desc => y.cmp(&x),
                },
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortField::Title => {
                let ord = a.title.to_lowercase().cmp(&b.title.to_lowercase());
                match self.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            }
        };

        primary.then_with(|| a.id.cmp(&b.id))
    }

    /// Sort items in place.
    pub fn sort(&self, items: &mut [Content]) {
        items.sort_by(|a, b| self.compare(a, b));
    }

    /// SQL `ORDER BY` body for this option over the `c` content alias.
    pub fn order_by_sql(&self) -> &'static str {
        match (self.field, self.order) {
            (SortField::Date, SortOrder::Desc) => "c.publish_date DESC NULLS LAST, c.id",
            (SortField::Date, SortOrder::Asc) => "c.publish_date ASC NULLS LAST, c.id",
            (SortField::Title, SortOrder::Desc) => "LOWER(c.title) DESC, c.id",
            (SortField::Title, SortOrder::Asc) => "LOWER(c.title) ASC, c.id",
        }
    }
}

impl Default for SortOption {
    fn default() -> Self {
        Self::date_desc()
    }
}

/// Pagination and sort for a list call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Maximum rows to return; `None` returns everything.
    pub limit: Option<usize>,
    /// Rows to skip.
    pub offset: usize,
    /// Ordering.
    #[serde(default)]
    pub sort: SortOption,
}

impl QueryOptions {
    /// Everything, newest first.
    pub fn all() -> Self {
        Self::default()
    }

    /// A single page.
    pub fn page(limit: usize, offset: usize) -> Self {
        Self {
            limit: Some(limit),
            offset,
            sort: SortOption::default(),
        }
    }

    /// Replace the sort option.
    pub fn sorted_by(mut self, sort: SortOption) -> Self {
        self.sort = sort;
        self
    }

    /// Apply offset and limit to an already ordered list.
    ///
    /// An offset past the end yields an empty list.
    pub fn paginate<T>(&self, items: Vec<T>) -> Vec<T> {
        let iter = items.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

/// Inclusive range over `publish_date`. Either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    /// Earliest publish date, inclusive.
    pub start: Option<DateTime<Utc>>,
    /// Latest publish date, inclusive.
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Create a closed range.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// `end < start`; such a range matches nothing.
    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if e < s)
    }

    /// Whether a publish date falls in range. Undated items only match
    /// an unbounded range.
    pub fn contains(&self, publish_date: Option<DateTime<Utc>>) -> bool {
        if self.start.is_none() && self.end.is_none() {
            return true;
        }
        let Some(date) = publish_date else {
            return false;
        };
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// Narrowing filters for keyword search.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Restrict to these content types (empty = any).
    #[serde(default)]
    pub content_types: BTreeSet<ContentType>,
    /// Require at least one of these tags (empty = any).
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Publish-date window.
    #[serde(default)]
    pub date_range: DateRange,
}

impl SearchFilters {
    /// Restrict to a content type.
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_types.insert(content_type);
        self
    }

    /// Require a tag (any-of across all added tags).
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Set the publish-date window.
    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }

    /// Whether an item passes every filter.
    pub fn matches(&self, content: &Content) -> bool {
        (self.content_types.is_empty() || self.content_types.contains(&content.content_type))
            && (self.tags.is_empty() || self.tags.iter().any(|t| content.tags.contains(t)))
            && self.date_range.contains(content.publish_date)
    }
}

/// Tag with its usage count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    /// Tag value.
    pub tag: String,
    /// Number of visible items carrying it.
    pub count: u64,
}
