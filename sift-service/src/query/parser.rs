//! Textual filter/sort grammar parser
//!
//! Turns raw request text into raw clause lists. No property validation or
//! value conversion happens here; that is the resolver's job. The grammar is
//! fixed:
//!
//! - Filter text is a comma-separated list of `<name><operator><value>`
//!   segments. The value part may hold `|`-separated alternatives, which
//!   OR-combine on the same property; distinct segments AND-combine.
//! - Operators: `==` `!=` `>` `>=` `<` `<=` `@=` (contains) `_=`
//!   (starts-with) `_-=` (ends-with), each optionally suffixed with `*` for
//!   case-insensitive matching.
//! - Sort text is a comma-separated list of property names; a `-` prefix
//!   means descending. Order of appearance fixes tie-break precedence.
//!
//! Malformed segments are collected as issues, not returned one at a time,
//! so every problem in a request is reported together.

use crate::error::ClauseIssue;

use super::ast::{FilterOperator, SortDirection};

/// One parsed but not yet validated filter test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFilterClause {
    /// The clause as written, for error messages
    pub text: String,
    /// Property name as given in the request
    pub property: String,
    /// Parsed operator
    pub operator: FilterOperator,
    /// Whether the `*` case-insensitive suffix was present
    pub case_insensitive: bool,
    /// Unconverted value text
    pub value: String,
}

/// OR-combined alternatives parsed from one comma-separated segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFilterGroup {
    /// Alternatives; a record matches the group if any clause matches
    pub clauses: Vec<RawFilterClause>,
}

/// One parsed but not yet validated sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSortClause {
    /// The clause as written, for error messages
    pub text: String,
    /// Property name as given in the request
    pub property: String,
    /// Direction; `-` prefix means descending
    pub direction: SortDirection,
}

/// Parser output for filter text
#[derive(Debug, Default)]
pub struct ParsedFilters {
    /// Well-formed AND-groups in request order
    pub groups: Vec<RawFilterGroup>,
    /// Malformed segments
    pub issues: Vec<ClauseIssue>,
}

/// Parser output for sort text
#[derive(Debug, Default)]
pub struct ParsedSorts {
    /// Well-formed sort keys in request order
    pub clauses: Vec<RawSortClause>,
    /// Malformed segments
    pub issues: Vec<ClauseIssue>,
}

// Longest token first so `>=` wins over `>` and `_-=` over `_=`.
const OPERATOR_TOKENS: &[(&str, FilterOperator, bool)] = &[
    ("_-=*", FilterOperator::EndsWith, true),
    ("==*", FilterOperator::Equal, true),
    ("!=*", FilterOperator::NotEqual, true),
    ("@=*", FilterOperator::Contains, true),
    ("_=*", FilterOperator::StartsWith, true),
    ("_-=", FilterOperator::EndsWith, false),
    ("==", FilterOperator::Equal, false),
    ("!=", FilterOperator::NotEqual, false),
    (">=", FilterOperator::GreaterThanOrEqual, false),
    ("<=", FilterOperator::LessThanOrEqual, false),
    ("@=", FilterOperator::Contains, false),
    ("_=", FilterOperator::StartsWith, false),
    (">", FilterOperator::GreaterThan, false),
    ("<", FilterOperator::LessThan, false),
];

/// Locate the first operator token in a segment
///
/// Scans left to right; at each position the longest matching token wins,
/// so `age>=18` parses as `>=`, not `>` with a stray `=` in the value.
fn find_operator(segment: &str) -> Option<(usize, &'static str, FilterOperator, bool)> {
    for start in segment.char_indices().map(|(i, _)| i) {
        let rest = &segment[start..];
        for &(token, operator, case_insensitive) in OPERATOR_TOKENS {
            if rest.starts_with(token) {
                return Some((start, token, operator, case_insensitive));
            }
        }
    }
    None
}

/// Parse filter text into raw AND-groups
///
/// Blank input yields an empty result. Malformed segments (missing operator
/// or missing property name) are recorded as issues and skipped.
pub fn parse_filters(text: &str) -> ParsedFilters {
    let mut parsed = ParsedFilters::default();

    for segment in text.split(',') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let Some((at, token, operator, case_insensitive)) = find_operator(segment) else {
            parsed
                .issues
                .push(ClauseIssue::new(segment, "missing comparison operator"));
            continue;
        };

        let property = segment[..at].trim();
        if property.is_empty() {
            parsed
                .issues
                .push(ClauseIssue::new(segment, "missing property name"));
            continue;
        }

        let value_part = segment[at + token.len()..].trim();
        let clauses = value_part
            .split('|')
            .map(|alternative| RawFilterClause {
                text: segment.to_string(),
                property: property.to_string(),
                operator,
                case_insensitive,
                value: alternative.trim().to_string(),
            })
            .collect();

        parsed.groups.push(RawFilterGroup { clauses });
    }

    parsed
}

/// Parse sort text into raw sort keys
///
/// Blank input yields an empty result. A bare `-` is recorded as an issue.
pub fn parse_sorts(text: &str) -> ParsedSorts {
    let mut parsed = ParsedSorts::default();

    for segment in text.split(',') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let (property, direction) = match segment.strip_prefix('-') {
            Some(name) => (name.trim(), SortDirection::Descending),
            None => (segment, SortDirection::Ascending),
        };

        if property.is_empty() {
            parsed
                .issues
                .push(ClauseIssue::new(segment, "missing property name"));
            continue;
        }

        parsed.clauses.push(RawSortClause {
            text: segment.to_string(),
            property: property.to_string(),
            direction,
        });
    }

    parsed
}
