//! Entity storage: repository traits, in-memory backend, unit of work
//!
//! - [`Repository`] and [`Entity`] define the storage seam (RPITIT async).
//! - [`MemoryStore`] and [`MemoryRepository`] are the in-memory backend with
//!   staged, all-or-nothing mutation batches.
//! - [`UnitOfWork`] hands out memoized repositories from a startup-time
//!   factory registry and commits or discards the staged batches.

pub mod memory;
pub mod traits;
pub mod unit_of_work;

pub use memory::{MemoryRepository, MemoryStore};
pub use traits::{Entity, Repository, StorageResult, Transactional};
pub use unit_of_work::{UnitOfWork, UnitOfWorkBuilder};
