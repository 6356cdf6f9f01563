//! Paged collection retrieval.
//!
//! Collection endpoints return at most `num_elements` items per call together
//! with the total `count`. [`CollectionPager`] walks the collection from
//! offset 0, advancing by the number of items each page actually returned,
//! until the total is reached or a page comes back empty.
//!
//! # Example
//!
//! ```rust,no_run
//! use appnexus_api_client::rest::{AppNexusClient, FieldFilter};
//!
//! # async fn example(client: &AppNexusClient) -> Result<(), appnexus_api_client::AppNexusError> {
//! let active = client
//!     .pager("line-items", "/line-item?advertiser_id=10")
//!     .filter(FieldFilter::new("state", "active"))
//!     .page_size(50)
//!     .fetch_all()
//!     .await?;
//! println!("{} active line items", active.len());
//! # Ok(())
//! # }
//! ```

use serde_json::Value;

use crate::error::AppNexusError;
use crate::rest::AppNexusClient;
use crate::rest::client::with_query;
use crate::rest::endpoints::paging::{COUNT, NUM_ELEMENTS, START_ELEMENT};
use crate::rest::response::u64_field;
use crate::types::Values;

/// Keep only items whose `field` equals `value` exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    /// Item field to compare
    pub field: String,
    /// Required value
    pub value: Value,
}

impl FieldFilter {
    /// Create a new exact-match filter.
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether `item` passes this filter.
    pub fn matches(&self, item: &Values) -> bool {
        item.get(&self.field) == Some(&self.value)
    }
}

/// Offset state for one paged fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// Offset of the next page
    pub start_element: u64,
    /// Items requested per page
    pub page_size: u32,
    /// Total reported by the server, once known
    pub total_count: Option<u64>,
}

impl PageCursor {
    /// A cursor at offset 0.
    pub fn new(page_size: u32) -> Self {
        Self {
            start_element: 0,
            page_size: page_size.max(1),
            total_count: None,
        }
    }

    /// Move past `returned` items.
    pub fn advance(&mut self, returned: usize) {
        self.start_element += returned as u64;
    }

    /// Whether the server reported more items beyond the current offset.
    pub fn has_more(&self) -> bool {
        self.total_count
            .is_some_and(|total| self.start_element < total)
    }
}

/// Split a page into its item count and its object items.
///
/// Non-object entries count toward the total but are not returned. A missing
/// or non-array field counts as an empty page.
pub(crate) fn page_items(values: &Values, field: &str) -> (usize, Vec<Values>) {
    match values.get(field) {
        Some(Value::Array(items)) => (
            items.len(),
            items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect(),
        ),
        _ => (0, Vec::new()),
    }
}

/// Fetches every page of a collection.
#[derive(Debug)]
pub struct CollectionPager<'a> {
    client: &'a AppNexusClient,
    field: String,
    uri: String,
    filters: Vec<FieldFilter>,
    page_size: u32,
}

impl<'a> CollectionPager<'a> {
    /// Page through `uri`, collecting the array under `field`.
    pub fn new(client: &'a AppNexusClient, field: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            client,
            field: field.into(),
            uri: uri.into(),
            filters: Vec::new(),
            page_size: client.page_size(),
        }
    }

    /// Add an exact-match filter. All filters must match.
    pub fn filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add several exact-match filters.
    pub fn filters(mut self, filters: impl IntoIterator<Item = FieldFilter>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Override the client's default page size.
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Fetch all pages.
    ///
    /// Filters run after counting, so how far the cursor advances does not
    /// depend on how many items a filter keeps.
    pub async fn fetch_all(self) -> Result<Vec<Values>, AppNexusError> {
        let mut cursor = PageCursor::new(self.page_size);
        let mut results = Vec::new();

        loop {
            let page_uri = with_query(
                &self.uri,
                &[
                    (START_ELEMENT, cursor.start_element.to_string()),
                    (NUM_ELEMENTS, cursor.page_size.to_string()),
                ],
            )?;

            let Some(values) = self.client.get(&page_uri).await? else {
                tracing::debug!(uri = %self.uri, start = cursor.start_element, "Page not available; stopping");
                break;
            };

            let (returned, items) = page_items(&values, &self.field);
            cursor.total_count = u64_field(&values, COUNT);
            tracing::debug!(
                uri = %self.uri,
                requested_start = cursor.start_element,
                server_start = ?u64_field(&values, START_ELEMENT),
                server_num = ?u64_field(&values, NUM_ELEMENTS),
                total = ?cursor.total_count,
                returned,
                "Fetched page"
            );

            results.extend(
                items
                    .into_iter()
                    .filter(|item| self.filters.iter().all(|f| f.matches(item))),
            );
            cursor.advance(returned);

            if returned == 0 || !cursor.has_more() {
                break;
            }
        }

        Ok(results)
    }
}

impl AppNexusClient {
    /// Start a paged fetch of the array under `field`.
    pub fn pager(&self, field: impl Into<String>, uri: impl Into<String>) -> CollectionPager<'_> {
        CollectionPager::new(self, field, uri)
    }

    /// Fetch a whole paged collection with the default page size.
    pub async fn get_all(
        &self,
        field: &str,
        uri: &str,
        filters: &[FieldFilter],
    ) -> Result<Vec<Values>, AppNexusError> {
        self.pager(field, uri)
            .filters(filters.iter().cloned())
            .fetch_all()
            .await
    }

    /// Fetch a whole paged collection with an explicit page size.
    pub async fn get_all_with_page_size(
        &self,
        field: &str,
        uri: &str,
        filters: &[FieldFilter],
        page_size: u32,
    ) -> Result<Vec<Values>, AppNexusError> {
        self.pager(field, uri)
            .filters(filters.iter().cloned())
            .page_size(page_size)
            .fetch_all()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(v: Value) -> Values {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_cursor_progress() {
        let mut cursor = PageCursor::new(100);
        assert!(!cursor.has_more());

        cursor.total_count = Some(250);
        assert!(cursor.has_more());
        cursor.advance(100);
        cursor.advance(100);
        assert!(cursor.has_more());
        cursor.advance(50);
        assert_eq!(cursor.start_element, 250);
        assert!(!cursor.has_more());
    }

    #[test]
    fn test_cursor_page_size_at_least_one() {
        assert_eq!(PageCursor::new(0).page_size, 1);
    }

    #[test]
    fn test_page_items_counts_non_objects() {
        let page = values(json!({"campaigns": [{"id": 1}, null, {"id": 2}]}));
        let (returned, items) = page_items(&page, "campaigns");
        assert_eq!(returned, 3);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_page_items_missing_field() {
        let page = values(json!({"count": 10}));
        assert_eq!(page_items(&page, "campaigns").0, 0);
    }

    #[test]
    fn test_field_filter_exact_match() {
        let item = values(json!({"state": "active", "advertiser_id": 10}));
        assert!(FieldFilter::new("state", "active").matches(&item));
        assert!(FieldFilter::new("advertiser_id", 10).matches(&item));
        assert!(!FieldFilter::new("state", "Active").matches(&item));
        assert!(!FieldFilter::new("advertiser_id", "10").matches(&item));
        assert!(!FieldFilter::new("missing", "x").matches(&item));
    }
}
