//! Repository trait definitions
//!
//! Generic traits for entity storage using RPITIT (Return Position Impl
//! Trait In Traits), available since Rust 1.75.
//!
//! Reads go straight to committed state. Mutations (`add`, `update`,
//! `delete`) are staged in the repository and take effect only when the
//! owning [`UnitOfWork`] commits them with `save_changes`.
//!
//! [`UnitOfWork`]: super::UnitOfWork

use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;

use crate::error::StorageError;
use crate::query::Queryable;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// A storable record with a primary key
///
/// The primary key ordering (`Ord`) defines the natural order `find_all`
/// returns rows in, which is also the final tie-break for sorted queries.
pub trait Entity: Queryable + Clone {
    /// Primary key type
    type Id: Clone + Eq + Hash + Ord + Display + Send + Sync + 'static;

    /// Entity name used in error context and log fields
    const NAME: &'static str;

    /// The primary key of this record
    fn id(&self) -> Self::Id;
}

/// Base repository trait for entity storage
///
/// # Example
///
/// ```rust,ignore
/// use sift_service::repository::{Entity, Repository, StorageResult};
///
/// async fn rename(repo: &impl Repository<Student>, id: i64) -> StorageResult<()> {
///     if let Some(mut student) = repo.find_by_id(&id).await? {
///         student.first_name = "Ann".to_string();
///         repo.update(student).await?; // staged until save_changes
///     }
///     Ok(())
/// }
/// ```
pub trait Repository<T: Entity>: Send + Sync {
    /// Find a record by its primary key
    ///
    /// Returns `Ok(None)` when no committed record has that key.
    fn find_by_id(&self, id: &T::Id) -> impl Future<Output = StorageResult<Option<T>>> + Send;

    /// All committed records in primary-key-ascending order
    fn find_all(&self) -> impl Future<Output = StorageResult<Vec<T>>> + Send;

    /// Number of committed records
    fn count(&self) -> impl Future<Output = StorageResult<u64>> + Send;

    /// Whether a committed record with this key exists
    fn exists(&self, id: &T::Id) -> impl Future<Output = StorageResult<bool>> + Send;

    /// Stage an insertion
    ///
    /// The key must not exist when the batch commits.
    fn add(&self, entity: T) -> impl Future<Output = StorageResult<()>> + Send;

    /// Stage a replacement of the record with the same key
    ///
    /// The key must exist when the batch commits.
    fn update(&self, entity: T) -> impl Future<Output = StorageResult<()>> + Send;

    /// Stage a removal by key
    ///
    /// The key must exist when the batch commits.
    fn delete(&self, id: &T::Id) -> impl Future<Output = StorageResult<()>> + Send;
}

/// Type-erased view of a repository's staged mutations
///
/// The [`UnitOfWork`] holds one of these per cached repository so it can
/// commit or discard every pending batch without knowing entity types.
///
/// [`UnitOfWork`]: super::UnitOfWork
pub trait Transactional: Send + Sync {
    /// Number of staged mutations
    fn pending_count(&self) -> usize;

    /// Check every staged mutation's precondition without applying anything
    ///
    /// The unit of work validates every cached repository before applying
    /// any of them, so one bad batch fails the whole save with every table
    /// untouched.
    fn validate(&self) -> StorageResult<()>;

    /// Apply every staged mutation, all or nothing
    ///
    /// Returns the number of mutations applied. On any precondition
    /// failure no row is touched and the batch stays staged.
    fn commit(&self) -> StorageResult<u64>;

    /// Drop every staged mutation without applying it
    fn discard(&self);
}
