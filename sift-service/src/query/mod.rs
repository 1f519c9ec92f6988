//! The query pipeline: parse, resolve, execute, paginate
//!
//! A search request flows through four stages:
//!
//! 1. [`parser`] turns raw filter/sort text into raw clauses (grammar only).
//! 2. [`QueryResolver`] validates clauses against the [`PropertyMapper`]
//!    registry and produces typed [`FilterPlan`]/[`SortPlan`] values.
//! 3. [`QueryEngine`] applies the plans to an in-memory sequence, returning
//!    the matches in stable order plus the total match count.
//! 4. [`paginate_with`] slices one page and wraps it in a [`PagedList`]
//!    envelope.
//!
//! [`PropertyMapper`]: crate::mapper::PropertyMapper

pub mod ast;
pub mod executor;
pub mod model;
pub mod paginator;
pub mod parser;
pub mod resolver;

pub use ast::{
    FilterClause, FilterGroup, FilterOperator, FilterPlan, FilterValue, SortClause, SortDirection,
    SortPlan,
};
pub use executor::{CustomMethods, QueryEngine, Queryable};
pub use model::QueryModel;
pub use paginator::{effective_page, effective_page_size, paginate_with, PagedList};
pub use resolver::QueryResolver;
