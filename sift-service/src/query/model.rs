//! Request-side query model
//!
//! [`QueryModel`] is the deserialized shape of a search request: raw filter
//! and sort text plus the pagination hints. It is plain data; nothing here is
//! validated until the resolver runs against the property registry.

use serde::{Deserialize, Serialize};

/// One search request as received from the caller
///
/// Deserializes from query-string style input, e.g.
/// `filters=firstName==Ann&sorts=-birthDate&page=2&pageSize=10`. Every field
/// is optional; absent pagination hints fall back to configured values.
///
/// # Example
///
/// ```rust
/// use sift_service::query::QueryModel;
///
/// let model: QueryModel =
///     serde_json::from_str(r#"{"filters":"id>=3","sorts":"-id","pageSize":10}"#).unwrap();
/// assert_eq!(model.filters.as_deref(), Some("id>=3"));
/// assert_eq!(model.page, None);
/// assert_eq!(model.page_size, Some(10));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryModel {
    /// Raw filter text, comma-separated clauses
    #[serde(default)]
    pub filters: Option<String>,
    /// Raw sort text, comma-separated property names
    #[serde(default)]
    pub sorts: Option<String>,
    /// Requested page number, 1-based
    #[serde(default)]
    pub page: Option<u32>,
    /// Requested page size
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl QueryModel {
    /// Filter text, empty when the request carried none
    #[must_use]
    pub fn filter_text(&self) -> &str {
        self.filters.as_deref().unwrap_or_default()
    }

    /// Sort text, empty when the request carried none
    #[must_use]
    pub fn sort_text(&self) -> &str {
        self.sorts.as_deref().unwrap_or_default()
    }
}
