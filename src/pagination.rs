//! Offset pagination over any countable collection
//!
//! [`paginate`] counts the records matching a filter, works out the
//! navigation links and fetches exactly one page. Count and fetch are two
//! separate storage calls with no snapshot between them, so a page can shift
//! if the collection changes in between.

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ApiError, AppResult};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

/// A validated page position: both fields are at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    limit: u64,
}

impl PageRequest {
    pub fn new(page: u64, limit: u64) -> Result<Self, ApiError> {
        if page == 0 {
            return Err(ApiError::validation("page must be at least 1"));
        }
        if limit == 0 {
            return Err(ApiError::validation("limit must be at least 1"));
        }
        Ok(Self { page, limit })
    }

    /// Read raw query values the lenient way: the leading digits are used
    /// (`"2abc"` is 2, `"5.0"` is 5), anything that does not start with a
    /// positive integer falls back to the default, and `limit` is capped at
    /// `max_limit`.
    pub fn from_query(
        page: Option<&str>,
        limit: Option<&str>,
        default_limit: u64,
        max_limit: u64,
    ) -> Self {
        let parse = |raw: Option<&str>| raw.and_then(leading_integer).filter(|value| *value > 0);

        let max_limit = max_limit.max(1);
        Self {
            page: parse(page).unwrap_or(DEFAULT_PAGE),
            limit: parse(limit)
                .unwrap_or(default_limit.max(1))
                .min(max_limit),
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Index of the first record on this page
    pub fn start(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Index one past the last record on this page
    pub fn end(&self) -> u64 {
        self.page.saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Integer prefix of a query value, ignoring surrounding whitespace and a `+`
fn leading_integer(raw: &str) -> Option<u64> {
    let raw = raw.trim_start();
    let raw = raw.strip_prefix('+').unwrap_or(raw);
    let end = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let digits = &raw[..end];
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse::<u64>().unwrap_or(u64::MAX))
}

/// Position of a neighbouring page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PageLink {
    pub page: u64,
    pub limit: u64,
}

/// One page of records plus navigation metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub total_items: u64,
    pub total_pages: u64,
    pub current_page: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<PageLink>,
    pub data: Vec<T>,
}

/// Window handed to [`Collection::find`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindOptions<R> {
    pub skip: u64,
    pub limit: u64,
    pub expand: Vec<R>,
}

/// Storage capability required by [`paginate`]
#[cfg_attr(test, mockall::automock(type Record = u32; type Filter = (); type Relation = ();))]
#[async_trait]
pub trait Collection: Send + Sync {
    type Record: Send;
    type Filter: Send + Sync;
    /// Reference that can be resolved inline on fetch
    type Relation: Clone + Send + Sync;

    async fn count(&self, filter: &Self::Filter) -> AppResult<u64>;

    async fn find(
        &self,
        filter: &Self::Filter,
        options: FindOptions<Self::Relation>,
    ) -> AppResult<Vec<Self::Record>>;
}

/// Fetch one page of `collection` matching `filter`
pub async fn paginate<C: Collection>(
    collection: &C,
    filter: &C::Filter,
    request: PageRequest,
    expand: &[C::Relation],
) -> AppResult<Page<C::Record>> {
    let (page, limit) = (request.page(), request.limit());
    let start = request.start();

    let total_items = collection.count(filter).await?;
    let total_pages = total_items.div_ceil(limit);

    let next = (request.end() < total_items).then(|| PageLink {
        page: page.saturating_add(1),
        limit,
    });
    let previous = (start > 0).then(|| PageLink {
        page: page - 1,
        limit,
    });

    let data = if start >= total_items {
        Vec::new()
    } else {
        collection
            .find(
                filter,
                FindOptions {
                    skip: start,
                    limit,
                    expand: expand.to_vec(),
                },
            )
            .await?
    };

    Ok(Page {
        total_items,
        total_pages,
        current_page: page,
        next,
        previous,
        data,
    })
}
