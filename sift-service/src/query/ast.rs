//! Filter and sort plan types
//!
//! The textual query grammar is parsed and validated exactly once, producing
//! the typed plans in this module. Evaluation never re-interprets raw text:
//! a [`FilterPlan`] holds converted, property-resolved clauses and a
//! [`SortPlan`] holds an ordered list of sort keys.
//!
//! # Example
//!
//! ```rust
//! use sift_service::query::{FilterOperator, FilterValue, SortDirection};
//!
//! assert_eq!(format!("{}", FilterOperator::Contains), "@=");
//! assert_eq!(format!("{}", SortDirection::Descending), "desc");
//!
//! let value: FilterValue = 42_i64.into();
//! assert_eq!(value, FilterValue::Integer(42));
//! ```

use std::fmt;

use chrono::NaiveDate;

/// Direction for ordering results
///
/// # Example
///
/// ```rust
/// use sift_service::query::SortDirection;
///
/// assert_eq!(format!("{}", SortDirection::Ascending), "asc");
/// assert_eq!(format!("{}", SortDirection::Descending), "desc");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    Descending,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// Comparison operators accepted by the filter grammar
///
/// The token set is fixed. Case-insensitive matching is carried separately on
/// the clause (`*` suffix in the grammar), so `==` and `==*` both map to
/// [`FilterOperator::Equal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// Equal to (`==`)
    Equal,
    /// Not equal to (`!=`)
    NotEqual,
    /// Greater than (`>`)
    GreaterThan,
    /// Greater than or equal to (`>=`)
    GreaterThanOrEqual,
    /// Less than (`<`)
    LessThan,
    /// Less than or equal to (`<=`)
    LessThanOrEqual,
    /// Substring match (`@=`)
    Contains,
    /// Prefix match (`_=`)
    StartsWith,
    /// Suffix match (`_-=`)
    EndsWith,
}

impl FilterOperator {
    /// The grammar token for this operator (without the case-insensitive `*`)
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::Contains => "@=",
            Self::StartsWith => "_=",
            Self::EndsWith => "_-=",
        }
    }

    /// Whether the operator orders values rather than testing string shape
    ///
    /// Ordering operators apply to every value kind; the string-shape
    /// operators (`@=`, `_=`, `_-=`) only make sense for string properties.
    #[must_use]
    pub const fn is_ordering(&self) -> bool {
        matches!(
            self,
            Self::GreaterThan | Self::GreaterThanOrEqual | Self::LessThan | Self::LessThanOrEqual
        )
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A typed value used in filter comparisons and surfaced from records
///
/// Filter text carries untyped values; the resolver converts each one against
/// the mapped property's declared kind before a plan is produced. Records
/// surface their fields as the same type via
/// [`Queryable::field`](crate::query::Queryable::field).
///
/// # Example
///
/// ```rust
/// use sift_service::query::FilterValue;
///
/// let s: FilterValue = "active".into();
/// let n: FilterValue = 42_i64.into();
/// let b: FilterValue = true.into();
/// assert_eq!(s, FilterValue::String("active".to_string()));
/// assert_eq!(n, FilterValue::Integer(42));
/// assert_eq!(b, FilterValue::Boolean(true));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// String value
    String(String),
    /// 64-bit integer value
    Integer(i64),
    /// 64-bit floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// Calendar date value
    Date(NaiveDate),
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Date(d) => write!(f, "{d}"),
        }
    }
}

/// One validated property–operator–value test
///
/// `external_name` is the name as it appeared in the request; `target` is the
/// declared property name the record is asked for. When `custom_method` is
/// set, the named registered filter function is used instead of the default
/// comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    /// External (request-facing) property name
    pub external_name: String,
    /// Declared property name on the entity
    pub target: String,
    /// Comparison operator
    pub operator: FilterOperator,
    /// Whether string comparison ignores case (`*` suffix in the grammar)
    pub case_insensitive: bool,
    /// Converted comparison value
    pub value: FilterValue,
    /// Name of a registered custom filter method, if the mapping declares one
    pub custom_method: Option<String>,
}

/// A group of clauses combined with OR
///
/// A record matches the group if any clause matches. Groups themselves
/// AND-combine inside a [`FilterPlan`].
pub type FilterGroup = Vec<FilterClause>;

/// A validated filter plan: AND of OR-groups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterPlan {
    /// AND-combined groups; each group is OR-combined internally
    pub groups: Vec<FilterGroup>,
}

impl FilterPlan {
    /// A plan that matches every record
    #[must_use]
    pub const fn empty() -> Self {
        Self { groups: Vec::new() }
    }

    /// Whether the plan applies no filtering at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// One validated sort key
#[derive(Debug, Clone, PartialEq)]
pub struct SortClause {
    /// External (request-facing) property name
    pub external_name: String,
    /// Declared property name on the entity
    pub target: String,
    /// Sort direction
    pub direction: SortDirection,
    /// Tie-break precedence: 0 is the primary key, 1 the first tie-breaker
    pub ordinal: usize,
    /// Name of a registered custom comparer, if the mapping declares one
    pub custom_method: Option<String>,
}

/// A validated sort plan in declared precedence order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortPlan {
    /// Sort clauses, primary key first
    pub clauses: Vec<SortClause>,
}

impl SortPlan {
    /// A plan that leaves the sequence in its natural order
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    /// Whether the plan applies no ordering at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}
