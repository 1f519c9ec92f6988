//! # sift-service
//!
//! Filterable, sortable, paginated collections over a generic unit-of-work
//! data layer.
//!
//! A request flows through a fixed pipeline: raw filter/sort text is parsed
//! against a small grammar, validated against a startup-time property
//! registry, executed over repository data, and sliced into a [`PagedList`]
//! envelope. Mutations are staged per repository and committed all-or-nothing
//! through a [`UnitOfWork`]. Every service operation answers with a
//! [`ServiceResult`] that classifies the outcome for transport code.
//!
//! [`PagedList`]: query::PagedList
//! [`UnitOfWork`]: repository::UnitOfWork
//! [`ServiceResult`]: result::ServiceResult
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sift_service::mapper::ValueKind;
//! use sift_service::prelude::*;
//!
//! #[derive(Clone)]
//! struct Student {
//!     id: i64,
//!     first_name: String,
//! }
//!
//! impl Queryable for Student {
//!     fn field(&self, property: &str) -> Option<FilterValue> {
//!         match property {
//!             "id" => Some(self.id.into()),
//!             "first_name" => Some(self.first_name.clone().into()),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! impl Entity for Student {
//!     type Id = i64;
//!     const NAME: &'static str = "Student";
//!     fn id(&self) -> i64 {
//!         self.id
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mapper = Arc::new(
//!     PropertyMapper::builder()
//!         .entity::<Student>(|e| {
//!             e.property("id", ValueKind::Integer).filterable().sortable();
//!             e.property("first_name", ValueKind::String)
//!                 .filterable()
//!                 .sortable()
//!                 .alias("firstName");
//!         })
//!         .build(),
//! );
//!
//! let store = Arc::new(MemoryStore::new());
//! store
//!     .seed([
//!         Student { id: 1, first_name: "Ann".into() },
//!         Student { id: 2, first_name: "Bob".into() },
//!     ])
//!     .unwrap();
//!
//! let unit_of_work = Arc::new(UnitOfWork::builder().register::<Student>().build(store));
//! let engine = Arc::new(QueryEngine::new(&mapper, CustomMethods::<Student>::new()).unwrap());
//! let service = EntityService::new(unit_of_work, mapper, engine, QueryConfig::default());
//!
//! let model = QueryModel {
//!     filters: Some("firstName==Ann".into()),
//!     ..QueryModel::default()
//! };
//! let page = service.paged_data(&model).await;
//! assert_eq!(page.value().unwrap().total_item_count, 1);
//! # }
//! ```

pub mod config;
pub mod error;
pub mod mapper;
pub mod observability;
pub mod query;
pub mod repository;
pub mod result;
pub mod service;

pub use error::{Error, Result};

/// Commonly used types, re-exported for application code
pub mod prelude {
    pub use crate::config::{QueryConfig, UnknownPropertyPolicy};
    pub use crate::error::{Error, Result};
    pub use crate::mapper::PropertyMapper;
    pub use crate::observability::init_tracing;
    pub use crate::query::{
        CustomMethods, FilterOperator, FilterValue, PagedList, QueryEngine, QueryModel, Queryable,
        SortDirection,
    };
    pub use crate::repository::{Entity, MemoryRepository, MemoryStore, Repository, UnitOfWork};
    pub use crate::result::{ServiceResult, StatusHint};
    pub use crate::service::EntityService;

    pub use tokio_util::sync::CancellationToken;
}
