//! Plan execution against record sequences
//!
//! The [`QueryEngine`] applies a validated [`FilterPlan`] and [`SortPlan`] to
//! an in-memory sequence of records. Records surface their fields through the
//! [`Queryable`] trait; the engine never touches raw request text.
//!
//! Evaluation order is fixed: filtering first, then sorting, and the caller
//! paginates last. The sort is stable, so records that tie on every declared
//! sort key keep the sequence's natural order (repositories hand records over
//! in primary-key ascending order, which makes the implicit final tie-break
//! the primary key).
//!
//! Named custom filter methods and comparers may be registered per entity
//! type; every name referenced by a property mapping is checked when the
//! engine is constructed, so a missing registration fails at startup rather
//! than on the first request.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::mapper::PropertyMapper;

use super::ast::{
    FilterClause, FilterOperator, FilterPlan, FilterValue, SortDirection, SortPlan,
};

/// Field access for filterable/sortable records
///
/// # Example
///
/// ```rust
/// use sift_service::query::{FilterValue, Queryable};
///
/// struct Student {
///     id: i64,
///     first_name: String,
/// }
///
/// impl Queryable for Student {
///     fn field(&self, property: &str) -> Option<FilterValue> {
///         match property {
///             "id" => Some(FilterValue::Integer(self.id)),
///             "first_name" => Some(FilterValue::String(self.first_name.clone())),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Queryable: Send + Sync + 'static {
    /// Surface the named property's current value
    ///
    /// Returns `None` for properties the record does not expose; a filter
    /// clause against an absent field evaluates false.
    fn field(&self, property: &str) -> Option<FilterValue>;
}

type CustomFilterFn<T> = Arc<dyn Fn(&T, &FilterClause) -> bool + Send + Sync>;
type CustomSortFn<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Registry of named custom filter methods and comparers for one entity type
///
/// # Example
///
/// ```rust
/// use std::cmp::Ordering;
/// use sift_service::query::CustomMethods;
///
/// struct Student { id: i64, first_name: String }
///
/// let mut methods = CustomMethods::<Student>::new();
/// methods.register_sort("by_id_then_first_name", |a, b| {
///     a.id.cmp(&b.id).then_with(|| a.first_name.cmp(&b.first_name))
/// });
/// ```
pub struct CustomMethods<T> {
    filters: HashMap<String, CustomFilterFn<T>>,
    sorts: HashMap<String, CustomSortFn<T>>,
}

impl<T> Default for CustomMethods<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CustomMethods<T> {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            filters: HashMap::new(),
            sorts: HashMap::new(),
        }
    }

    /// Register a named filter method
    pub fn register_filter(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&T, &FilterClause) -> bool + Send + Sync + 'static,
    ) {
        self.filters.insert(name.into(), Arc::new(f));
    }

    /// Register a named comparer
    pub fn register_sort(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    ) {
        self.sorts.insert(name.into(), Arc::new(f));
    }
}

/// Applies validated plans to record sequences for one entity type
pub struct QueryEngine<T> {
    methods: CustomMethods<T>,
}

impl<T: Queryable> QueryEngine<T> {
    /// Build the engine, validating custom method references
    ///
    /// Every `filter_with`/`sort_with` name declared for `T` in the mapper
    /// must have a registered method of the matching kind; otherwise this is
    /// a configuration error and construction fails.
    pub fn new(mapper: &PropertyMapper, methods: CustomMethods<T>) -> Result<Self> {
        for mapping in mapper.mappings_for::<T>() {
            if let Some(name) = &mapping.custom_filter {
                if !methods.filters.contains_key(name) {
                    return Err(Error::Config(format!(
                        "custom filter method `{name}` referenced by property `{}` is not registered",
                        mapping.external_name
                    )));
                }
            }
            if let Some(name) = &mapping.custom_sort {
                if !methods.sorts.contains_key(name) {
                    return Err(Error::Config(format!(
                        "custom sort method `{name}` referenced by property `{}` is not registered",
                        mapping.external_name
                    )));
                }
            }
        }
        Ok(Self { methods })
    }

    /// Filter and sort a sequence, returning it with its total match count
    ///
    /// The count is the number of matches, taken before any pagination
    /// slicing the caller performs.
    pub fn execute(&self, records: Vec<T>, filter: &FilterPlan, sort: &SortPlan) -> (Vec<T>, usize) {
        let mut matched: Vec<T> = records
            .into_iter()
            .filter(|record| self.matches(record, filter))
            .collect();
        let total = matched.len();

        if !sort.is_empty() {
            // Stable sort: exact ties keep the sequence's natural order.
            matched.sort_by(|a, b| self.compare(a, b, sort));
        }

        (matched, total)
    }

    /// Whether a record satisfies the plan (AND of OR-groups)
    pub fn matches(&self, record: &T, plan: &FilterPlan) -> bool {
        plan.groups.iter().all(|group| {
            group
                .iter()
                .any(|clause| self.clause_matches(record, clause))
        })
    }

    fn clause_matches(&self, record: &T, clause: &FilterClause) -> bool {
        if let Some(name) = &clause.custom_method {
            if let Some(method) = self.methods.filters.get(name) {
                return method(record, clause);
            }
            // Unreachable after construction-time validation.
            return false;
        }

        match record.field(&clause.target) {
            Some(field) => evaluate(&field, clause),
            None => false,
        }
    }

    fn compare(&self, a: &T, b: &T, plan: &SortPlan) -> Ordering {
        for clause in &plan.clauses {
            let ordering = if let Some(name) = &clause.custom_method {
                match self.methods.sorts.get(name) {
                    Some(method) => method(a, b),
                    None => Ordering::Equal,
                }
            } else {
                compare_fields(a.field(&clause.target), b.field(&clause.target))
            };

            let ordering = match clause.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            };

            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/// Order two optional field values; absent fields sort first
fn compare_fields(a: Option<FilterValue>, b: Option<FilterValue>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => compare_values(&a, &b).unwrap_or(Ordering::Equal),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Order two values of the same kind; `None` when kinds are incomparable
fn compare_values(a: &FilterValue, b: &FilterValue) -> Option<Ordering> {
    match (a, b) {
        (FilterValue::String(a), FilterValue::String(b)) => Some(a.cmp(b)),
        (FilterValue::Integer(a), FilterValue::Integer(b)) => Some(a.cmp(b)),
        (FilterValue::Float(a), FilterValue::Float(b)) => a.partial_cmp(b),
        (FilterValue::Integer(a), FilterValue::Float(b)) => (*a as f64).partial_cmp(b),
        (FilterValue::Float(a), FilterValue::Integer(b)) => a.partial_cmp(&(*b as f64)),
        (FilterValue::Boolean(a), FilterValue::Boolean(b)) => Some(a.cmp(b)),
        (FilterValue::Date(a), FilterValue::Date(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Evaluate one clause against a field value
///
/// A field of a mismatched kind never matches.
fn evaluate(field: &FilterValue, clause: &FilterClause) -> bool {
    use FilterOperator::*;

    if matches!(clause.operator, Contains | StartsWith | EndsWith) {
        let (FilterValue::String(field), FilterValue::String(value)) = (field, &clause.value)
        else {
            return false;
        };
        let (field, value) = if clause.case_insensitive {
            (field.to_lowercase(), value.to_lowercase())
        } else {
            (field.clone(), value.clone())
        };
        return match clause.operator {
            Contains => field.contains(&value),
            StartsWith => field.starts_with(&value),
            EndsWith => field.ends_with(&value),
            _ => false,
        };
    }

    let ordering = match (field, &clause.value) {
        (FilterValue::String(a), FilterValue::String(b)) if clause.case_insensitive => {
            Some(a.to_lowercase().cmp(&b.to_lowercase()))
        }
        _ => compare_values(field, &clause.value),
    };

    let Some(ordering) = ordering else {
        return false;
    };

    match clause.operator {
        Equal => ordering == Ordering::Equal,
        NotEqual => ordering != Ordering::Equal,
        GreaterThan => ordering == Ordering::Greater,
        GreaterThanOrEqual => ordering != Ordering::Less,
        LessThan => ordering == Ordering::Less,
        LessThanOrEqual => ordering != Ordering::Greater,
        Contains | StartsWith | EndsWith => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnknownPropertyPolicy;
    use crate::mapper::ValueKind;
    use crate::query::resolver::QueryResolver;
    use chrono::NaiveDate;

    #[derive(Debug, Clone, PartialEq)]
    struct Student {
        id: i64,
        first_name: String,
        last_name: String,
        birth_date: NaiveDate,
    }

    impl Queryable for Student {
        fn field(&self, property: &str) -> Option<FilterValue> {
            match property {
                "id" => Some(FilterValue::Integer(self.id)),
                "first_name" => Some(FilterValue::String(self.first_name.clone())),
                "last_name" => Some(FilterValue::String(self.last_name.clone())),
                "birth_date" => Some(FilterValue::Date(self.birth_date)),
                _ => None,
            }
        }
    }

    fn student(id: i64, first: &str, last: &str, ymd: (i32, u32, u32)) -> Student {
        Student {
            id,
            first_name: first.to_string(),
            last_name: last.to_string(),
            birth_date: NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2).unwrap(),
        }
    }

    fn dataset() -> Vec<Student> {
        vec![
            student(1, "Ann", "Kowalski", (2001, 5, 17)),
            student(2, "Bob", "Nowak", (2000, 1, 2)),
            student(3, "Ann", "Nowak", (2002, 9, 30)),
            student(4, "Cid", "Adams", (1999, 12, 24)),
        ]
    }

    fn mapper() -> PropertyMapper {
        PropertyMapper::builder()
            .entity::<Student>(|e| {
                e.property("id", ValueKind::Integer).filterable().sortable();
                e.property("first_name", ValueKind::String)
                    .filterable()
                    .sortable()
                    .alias("firstName");
                e.property("last_name", ValueKind::String)
                    .filterable()
                    .sortable()
                    .alias("lastName");
                e.property("birth_date", ValueKind::Date)
                    .filterable()
                    .sortable()
                    .alias("birthDate");
            })
            .build()
    }

    fn run(filters: &str, sorts: &str) -> (Vec<Student>, usize) {
        let mapper = mapper();
        let engine = QueryEngine::new(&mapper, CustomMethods::new()).unwrap();
        let (filter, sort) = QueryResolver::new(&mapper, UnknownPropertyPolicy::Reject)
            .resolve::<Student>(filters, sorts)
            .unwrap();
        engine.execute(dataset(), &filter, &sort)
    }

    #[test]
    fn test_equality_filter() {
        let (rows, total) = run("firstName==Ann", "");
        assert_eq!(total, 2);
        let ids: Vec<_> = rows.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3], "natural storage order when no sort given");
    }

    #[test]
    fn test_or_group_filter() {
        let (rows, _) = run("firstName==Ann|Bob", "id");
        let ids: Vec<_> = rows.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_and_groups_filter() {
        let (rows, total) = run("firstName==Ann,lastName==Nowak", "");
        assert_eq!(total, 1);
        assert_eq!(rows[0].id, 3);
    }

    #[test]
    fn test_ordering_operators_on_dates() {
        let (rows, _) = run("birthDate<2001-01-01", "id");
        let ids: Vec<_> = rows.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn test_string_shape_operators() {
        let (rows, _) = run("lastName_=Now", "id");
        assert_eq!(rows.len(), 2);

        let (rows, _) = run("lastName_-=ski", "");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 1);

        let (rows, _) = run("firstName@=nn", "");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_case_insensitive_variants() {
        let (rows, _) = run("firstName==*ANN", "id");
        assert_eq!(rows.len(), 2);

        let (rows, _) = run("lastName@=*NOW", "id");
        assert_eq!(rows.len(), 2);

        // Case-sensitive form does not match.
        let (rows, _) = run("firstName==ANN", "");
        assert!(rows.is_empty());
    }

    #[test]
    fn test_multi_key_sort_with_direction() {
        let (rows, _) = run("", "firstName,-birthDate");
        let ids: Vec<_> = rows.iter().map(|s| s.id).collect();
        // Ann (2002) before Ann (2001), then Bob, then Cid.
        assert_eq!(ids, vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_sort_is_stable_under_ties() {
        // Both Anns tie on first_name; natural (primary-key) order is kept.
        let (rows, _) = run("", "firstName");
        let ids: Vec<_> = rows.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3, 2, 4]);
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let mapper = mapper();
        let engine = QueryEngine::new(&mapper, CustomMethods::new()).unwrap();
        let (filter, sort) = QueryResolver::new(&mapper, UnknownPropertyPolicy::Reject)
            .resolve::<Student>("firstName==Ann", "")
            .unwrap();
        let (once, total_once) = engine.execute(dataset(), &filter, &sort);
        let (twice, total_twice) = engine.execute(once.clone(), &filter, &sort);
        assert_eq!(once, twice);
        assert_eq!(total_once, total_twice);
    }

    #[test]
    fn test_empty_plans_pass_everything_through() {
        let (rows, total) = run("", "");
        assert_eq!(total, 4);
        let ids: Vec<_> = rows.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_custom_sort_method() {
        let mapper = PropertyMapper::builder()
            .entity::<Student>(|e| {
                e.property("rank", ValueKind::String)
                    .sortable()
                    .sort_with("by_id_then_first_name");
            })
            .build();
        let mut methods = CustomMethods::new();
        methods.register_sort("by_id_then_first_name", |a: &Student, b: &Student| {
            a.id.cmp(&b.id).then_with(|| a.first_name.cmp(&b.first_name))
        });
        let engine = QueryEngine::new(&mapper, methods).unwrap();
        let (_, sort) = QueryResolver::new(&mapper, UnknownPropertyPolicy::Reject)
            .resolve::<Student>("", "-rank")
            .unwrap();
        let (rows, _) = engine.execute(dataset(), &FilterPlan::empty(), &sort);
        let ids: Vec<_> = rows.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1], "descending reverses the comparer");
    }

    #[test]
    fn test_custom_filter_method() {
        let mapper = PropertyMapper::builder()
            .entity::<Student>(|e| {
                e.property("full_name", ValueKind::String)
                    .filterable()
                    .filter_with("full_name_contains");
            })
            .build();
        let mut methods = CustomMethods::new();
        methods.register_filter("full_name_contains", |s: &Student, clause: &FilterClause| {
            let FilterValue::String(needle) = &clause.value else {
                return false;
            };
            format!("{} {}", s.first_name, s.last_name).contains(needle.as_str())
        });
        let engine = QueryEngine::new(&mapper, methods).unwrap();
        let (filter, _) = QueryResolver::new(&mapper, UnknownPropertyPolicy::Reject)
            .resolve::<Student>("full_name==Ann Nowak", "")
            .unwrap();
        let (rows, total) = engine.execute(dataset(), &filter, &SortPlan::empty());
        assert_eq!(total, 1);
        assert_eq!(rows[0].id, 3);
    }

    #[test]
    fn test_missing_custom_method_fails_at_startup() {
        let mapper = PropertyMapper::builder()
            .entity::<Student>(|e| {
                e.property("rank", ValueKind::String)
                    .sortable()
                    .sort_with("never_registered");
            })
            .build();
        match QueryEngine::new(&mapper, CustomMethods::<Student>::new()) {
            Ok(_) => panic!("expected a configuration error"),
            Err(Error::Config(msg)) => assert!(msg.contains("never_registered")),
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_not_equal_and_bounds() {
        let (rows, _) = run("id!=2", "id");
        let ids: Vec<_> = rows.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);

        let (rows, _) = run("id>=2,id<=3", "id");
        let ids: Vec<_> = rows.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }
}
