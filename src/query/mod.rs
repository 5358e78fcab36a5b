//! Search, categorical filter, sort, and page slicing over a cached collection.

/// Field selectors and [`Queryable`] impls for every record kind.
pub mod fields;

use std::{cmp::Ordering, fmt::Debug, sync::Arc};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{
    core::cache::ReadThroughCache,
    persist::PersistError,
    record::Record,
    types::SortDirection,
};

/// Why a page could not be produced.
#[derive(Debug, Error)]
pub enum QueryError {
    /// `page` or `page_size` is zero.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The cached collection could not be loaded.
    #[error(transparent)]
    Cache(#[from] PersistError),
}

/// Borrowed value of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    List(&'a [String]),
    Int(i64),
}

/// Owned comparand for a categorical filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Int(i64),
    Text(String),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// A record whose fields can be searched, filtered, and sorted.
pub trait Queryable: Record {
    /// Field selector for this kind.
    type Field: Copy + Eq + Debug + Send + Sync + Serialize + DeserializeOwned + 'static;
    /// Fields the free-text search looks at.
    const SEARCH_FIELDS: &'static [Self::Field];

    fn field(&self, field: Self::Field) -> FieldValue<'_>;
}

/// Exact-match filter on one field; list fields match on membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalFilter<F> {
    pub field: F,
    pub value: FilterValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec<F> {
    pub key: F,
    #[serde(default)]
    pub direction: SortDirection,
}

/// One page request. Deserializes from the board's query string/JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "F: Deserialize<'de>"))]
pub struct QueryParams<F> {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub filter: Option<CategoricalFilter<F>>,
    #[serde(default)]
    pub sort: Option<SortSpec<F>>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

impl<F> Default for QueryParams<F> {
    fn default() -> Self {
        Self {
            search: None,
            filter: None,
            sort: None,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl<F> QueryParams<F> {
    pub fn page(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            ..Self::default()
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_filter(mut self, field: F, value: impl Into<FilterValue>) -> Self {
        self.filter = Some(CategoricalFilter {
            field,
            value: value.into(),
        });
        self
    }

    pub fn with_sort(mut self, key: F, direction: SortDirection) -> Self {
        self.sort = Some(SortSpec { key, direction });
        self
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if self.page == 0 {
            return Err(QueryError::InvalidArgument("page must be >= 1".to_string()));
        }
        if self.page_size == 0 {
            return Err(QueryError::InvalidArgument(
                "pageSize must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// One page of results plus pagination metadata.
///
/// `total` counts matches before slicing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult<T> {
    /// At most `page_size` records; empty past the last page.
    pub items: Vec<T>,
    /// 1-based, echoed from the request.
    pub page: u32,
    pub page_size: u32,
    /// Matches after search and filter, before slicing.
    pub total: usize,
    /// `ceil(total / page_size)`; zero when nothing matched.
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Sorts, searches, filters, and slices `items` into one page.
///
/// The sort is stable, so ties keep their table order. A page past the end
/// yields no items rather than an error.
pub fn paginate<T: Queryable>(
    items: &[T],
    params: &QueryParams<T::Field>,
) -> Result<QueryResult<T>, QueryError> {
    params.validate()?;

    let mut view: Vec<&T> = items.iter().collect();

    if let Some(sort) = &params.sort {
        view.sort_by(|a, b| {
            let ord = compare_fields(a.field(sort.key), b.field(sort.key));
            match sort.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
    }

    if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        view.retain(|rec| matches_search(*rec, &needle));
    }

    if let Some(filter) = &params.filter {
        view.retain(|rec| matches_filter(rec.field(filter.field), &filter.value));
    }

    let total = view.len();
    let page = params.page as usize;
    let page_size = params.page_size as usize;
    let start = (page - 1).saturating_mul(page_size);
    let end = start.saturating_add(page_size).min(total);
    let items = if start < total {
        view[start..end].iter().map(|rec| (*rec).clone()).collect()
    } else {
        Vec::new()
    };

    Ok(QueryResult {
        items,
        page: params.page,
        page_size: params.page_size,
        total,
        total_pages: total.div_ceil(page_size),
        has_next: page.saturating_mul(page_size) < total,
        has_prev: page > 1,
    })
}

fn matches_search<T: Queryable>(rec: &T, needle: &str) -> bool {
    T::SEARCH_FIELDS.iter().any(|f| match rec.field(*f) {
        FieldValue::Text(s) => s.to_lowercase().contains(needle),
        FieldValue::List(values) => values.iter().any(|v| v.to_lowercase().contains(needle)),
        FieldValue::Int(_) => false,
    })
}

fn matches_filter(value: FieldValue<'_>, wanted: &FilterValue) -> bool {
    match (value, wanted) {
        (FieldValue::Text(s), FilterValue::Text(w)) => s == w,
        (FieldValue::Text(s), FilterValue::Int(w)) => s == w.to_string(),
        (FieldValue::List(values), FilterValue::Text(w)) => values.iter().any(|v| v == w),
        (FieldValue::List(values), FilterValue::Int(w)) => {
            let w = w.to_string();
            values.iter().any(|v| *v == w)
        }
        (FieldValue::Int(i), FilterValue::Int(w)) => i == *w,
        (FieldValue::Int(i), FilterValue::Text(w)) => i.to_string() == *w,
    }
}

fn compare_fields(a: FieldValue<'_>, b: FieldValue<'_>) -> Ordering {
    match (a, b) {
        (FieldValue::Int(x), FieldValue::Int(y)) => x.cmp(&y),
        (FieldValue::Text(x), FieldValue::Text(y)) => compare_text(x, y),
        (FieldValue::List(x), FieldValue::List(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(p, q)| compare_text(p, q))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (a, b) => kind_order(a).cmp(&kind_order(b)),
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
}

fn kind_order(value: FieldValue<'_>) -> u8 {
    match value {
        FieldValue::Int(_) => 0,
        FieldValue::Text(_) => 1,
        FieldValue::List(_) => 2,
    }
}

/// Read-only page queries served from the shared cache.
#[derive(Clone)]
pub struct QueryEngine {
    cache: Arc<ReadThroughCache>,
}

impl QueryEngine {
    pub fn new(cache: Arc<ReadThroughCache>) -> Self {
        Self { cache }
    }

    /// Validates `params`, then pages over the cached collection of `T`.
    pub async fn query_page<T: Queryable>(
        &self,
        params: &QueryParams<T::Field>,
    ) -> Result<QueryResult<T>, QueryError> {
        params.validate()?;
        let snapshot = self.cache.load().await?;
        let result = paginate(T::collection(&snapshot).as_slice(), params)?;
        tracing::debug!(
            entity = ?T::KIND,
            page = result.page,
            total = result.total,
            "page served"
        );
        Ok(result)
    }

    pub async fn get<T: Record>(&self, id: &str) -> Result<Option<T>, QueryError> {
        let snapshot = self.cache.load().await?;
        Ok(T::collection(&snapshot).get(id).cloned())
    }
}
