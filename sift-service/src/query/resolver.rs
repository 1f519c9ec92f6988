//! Validation of parsed queries against the property registry
//!
//! The resolver is the single place where raw request text becomes a typed,
//! validated plan. It checks every clause against the [`PropertyMapper`]
//! (existence and capability), converts values against the declared kind, and
//! collects every offending clause into one validation failure so callers can
//! report all problems at once.
//!
//! Unknown-property handling follows [`UnknownPropertyPolicy`]: rejection is
//! the default; the ignore mode drops only the offending clause and must be
//! opted into through configuration. Malformed clauses and unconvertible
//! values are always errors, regardless of policy.

use chrono::NaiveDate;

use crate::config::UnknownPropertyPolicy;
use crate::error::{ClauseIssue, Result, ValidationFailure};
use crate::mapper::{PropertyMapper, PropertyMapping, ValueKind};

use super::ast::{FilterClause, FilterOperator, FilterPlan, FilterValue, SortClause, SortPlan};
use super::parser::{self, RawFilterClause};

/// Resolves raw filter/sort text into validated plans for one entity type
pub struct QueryResolver<'a> {
    mapper: &'a PropertyMapper,
    policy: UnknownPropertyPolicy,
}

impl<'a> QueryResolver<'a> {
    /// Create a resolver over the shared property registry
    #[must_use]
    pub fn new(mapper: &'a PropertyMapper, policy: UnknownPropertyPolicy) -> Self {
        Self { mapper, policy }
    }

    /// Validate filter and sort text for entity type `T`
    ///
    /// Returns both plans, or a validation error enumerating every offending
    /// clause across both inputs.
    pub fn resolve<T: 'static>(&self, filters: &str, sorts: &str) -> Result<(FilterPlan, SortPlan)> {
        let mut failure = ValidationFailure::new();

        let filter_plan = self.resolve_filters::<T>(filters, &mut failure);
        let sort_plan = self.resolve_sorts::<T>(sorts, &mut failure);

        if failure.has_issues() {
            return Err(failure.into());
        }
        Ok((filter_plan, sort_plan))
    }

    fn resolve_filters<T: 'static>(
        &self,
        filters: &str,
        failure: &mut ValidationFailure,
    ) -> FilterPlan {
        let parsed = parser::parse_filters(filters);
        failure.issues.extend(parsed.issues);

        let mut plan = FilterPlan::empty();
        for group in parsed.groups {
            let mut clauses = Vec::with_capacity(group.clauses.len());
            for raw in group.clauses {
                match self.resolve_filter_clause::<T>(&raw) {
                    Ok(Some(clause)) => clauses.push(clause),
                    Ok(None) => {} // dropped by the ignore policy
                    Err(issue) => failure.push(issue),
                }
            }
            if !clauses.is_empty() {
                plan.groups.push(clauses);
            }
        }
        plan
    }

    fn resolve_filter_clause<T: 'static>(
        &self,
        raw: &RawFilterClause,
    ) -> std::result::Result<Option<FilterClause>, ClauseIssue> {
        let Some(mapping) = self.usable_mapping::<T>(&raw.property, Capability::Filter) else {
            return match self.policy {
                UnknownPropertyPolicy::Reject => Err(ClauseIssue::new(
                    &raw.text,
                    format!("property `{}` is not filterable", raw.property),
                )),
                UnknownPropertyPolicy::Ignore => Ok(None),
            };
        };

        // Equality and ordering apply to every kind; the string-shape
        // operators only make sense for string properties.
        let string_shape = matches!(
            raw.operator,
            FilterOperator::Contains | FilterOperator::StartsWith | FilterOperator::EndsWith
        );
        if string_shape && !matches!(mapping.kind, ValueKind::String) {
            return Err(ClauseIssue::new(
                &raw.text,
                format!(
                    "operator `{}` requires a string property, `{}` is {}",
                    raw.operator, mapping.external_name, mapping.kind
                ),
            ));
        }

        let value = convert_value(&raw.value, mapping.kind)
            .map_err(|reason| ClauseIssue::new(&raw.text, reason))?;

        Ok(Some(FilterClause {
            external_name: mapping.external_name.clone(),
            target: mapping.property.clone(),
            operator: raw.operator,
            case_insensitive: raw.case_insensitive,
            value,
            custom_method: mapping.custom_filter.clone(),
        }))
    }

    fn resolve_sorts<T: 'static>(&self, sorts: &str, failure: &mut ValidationFailure) -> SortPlan {
        let parsed = parser::parse_sorts(sorts);
        failure.issues.extend(parsed.issues);

        let mut plan = SortPlan::empty();
        for raw in parsed.clauses {
            let Some(mapping) = self.usable_mapping::<T>(&raw.property, Capability::Sort) else {
                match self.policy {
                    UnknownPropertyPolicy::Reject => failure.push(ClauseIssue::new(
                        &raw.text,
                        format!("property `{}` is not sortable", raw.property),
                    )),
                    UnknownPropertyPolicy::Ignore => {}
                }
                continue;
            };

            plan.clauses.push(SortClause {
                external_name: mapping.external_name.clone(),
                target: mapping.property.clone(),
                direction: raw.direction,
                ordinal: plan.clauses.len(),
                custom_method: mapping.custom_sort.clone(),
            });
        }
        plan
    }

    fn usable_mapping<T: 'static>(
        &self,
        external_name: &str,
        capability: Capability,
    ) -> Option<&PropertyMapping> {
        self.mapper
            .resolve::<T>(external_name)
            .filter(|mapping| match capability {
                Capability::Filter => mapping.filterable,
                Capability::Sort => mapping.sortable,
            })
    }
}

#[derive(Clone, Copy)]
enum Capability {
    Filter,
    Sort,
}

/// Convert raw value text against the declared kind
fn convert_value(raw: &str, kind: ValueKind) -> std::result::Result<FilterValue, String> {
    match kind {
        ValueKind::String => Ok(FilterValue::String(raw.to_string())),
        ValueKind::Integer => raw
            .parse::<i64>()
            .map(FilterValue::Integer)
            .map_err(|_| format!("`{raw}` is not a valid integer")),
        ValueKind::Float => raw
            .parse::<f64>()
            .map(FilterValue::Float)
            .map_err(|_| format!("`{raw}` is not a valid number")),
        ValueKind::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(FilterValue::Boolean(true)),
            "false" | "0" => Ok(FilterValue::Boolean(false)),
            _ => Err(format!("`{raw}` is not a valid boolean")),
        },
        ValueKind::Date => raw
            .parse::<NaiveDate>()
            .map(FilterValue::Date)
            .map_err(|_| format!("`{raw}` is not a valid date (expected YYYY-MM-DD)")),
    }
}
