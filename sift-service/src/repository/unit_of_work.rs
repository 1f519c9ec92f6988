//! Unit of work over a registry of repository factories
//!
//! Repository constructors are registered per entity type at startup through
//! [`UnitOfWorkBuilder`]; after `build` the factory map is immutable. Within
//! one unit-of-work scope the first `repository::<T>()` call runs the factory
//! and caches the instance, so repeated calls for the same entity type return
//! the same repository and accumulate into the same staged batch.
//!
//! `save_changes` commits every cached repository's staged mutations;
//! `rollback` discards them. Requesting an unregistered entity type is a
//! configuration error, not a panic.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result, StorageError, StorageOperation};

use super::memory::{MemoryRepository, MemoryStore};
use super::traits::{Entity, Transactional};

struct CachedRepository {
    any: Arc<dyn Any + Send + Sync>,
    txn: Arc<dyn Transactional>,
}

type Factory = Box<dyn Fn(&MemoryStore) -> CachedRepository + Send + Sync>;

/// Startup-time registry of repository constructors
#[derive(Default)]
pub struct UnitOfWorkBuilder {
    factories: HashMap<TypeId, Factory>,
}

impl UnitOfWorkBuilder {
    /// Register the repository constructor for entity type `T`
    #[must_use]
    pub fn register<T: Entity>(mut self) -> Self {
        self.factories.insert(
            TypeId::of::<T>(),
            Box::new(|store| {
                let repo = Arc::new(MemoryRepository::<T>::new(store));
                CachedRepository {
                    any: repo.clone(),
                    txn: repo,
                }
            }),
        );
        self
    }

    /// Freeze the registry into a unit of work over `store`
    #[must_use]
    pub fn build(self, store: Arc<MemoryStore>) -> UnitOfWork {
        UnitOfWork {
            store,
            factories: self.factories,
            cache: DashMap::new(),
        }
    }
}

/// One scope of repository access plus its staged mutations
///
/// # Example
///
/// ```rust,ignore
/// let uow = UnitOfWork::builder()
///     .register::<Student>()
///     .build(store);
///
/// let students = uow.repository::<Student>()?;
/// students.add(new_student).await?;
/// uow.save_changes(&CancellationToken::new()).await?;
/// ```
pub struct UnitOfWork {
    store: Arc<MemoryStore>,
    factories: HashMap<TypeId, Factory>,
    cache: DashMap<TypeId, CachedRepository>,
}

impl UnitOfWork {
    /// Start registering repository factories
    #[must_use]
    pub fn builder() -> UnitOfWorkBuilder {
        UnitOfWorkBuilder::default()
    }

    /// The repository for entity type `T`, memoized per scope
    ///
    /// The first call runs the registered factory; concurrent first calls
    /// for the same type collapse into one construction. Returns
    /// [`Error::Config`] when no factory was registered for `T`.
    pub fn repository<T: Entity>(&self) -> Result<Arc<MemoryRepository<T>>> {
        // The entry guard gives single-flight construction per TypeId.
        let entry = self
            .cache
            .entry(TypeId::of::<T>())
            .or_try_insert_with(|| {
                let factory = self.factories.get(&TypeId::of::<T>()).ok_or_else(|| {
                    Error::Config(format!(
                        "no repository registered for entity `{}`",
                        T::NAME
                    ))
                })?;
                Ok::<_, Error>(factory(&self.store))
            })?;

        entry
            .any
            .clone()
            .downcast::<MemoryRepository<T>>()
            .map_err(|_| {
                Error::Internal(format!("repository cache holds wrong type for `{}`", T::NAME))
            })
    }

    /// Commit every cached repository's staged mutations, all or nothing
    ///
    /// Checks the cancellation token before touching storage; a cancelled
    /// token leaves every batch staged. Every repository's batch is
    /// validated before any repository applies, so a precondition failure
    /// anywhere in the scope leaves every table untouched and every batch
    /// staged. Returns the number of mutations applied across all
    /// repositories.
    pub async fn save_changes(&self, token: &CancellationToken) -> Result<u64> {
        if token.is_cancelled() {
            return Err(StorageError::new(
                StorageOperation::Save,
                "save cancelled before commit",
            )
            .into());
        }

        for entry in self.cache.iter() {
            entry.txn.validate()?;
        }

        let mut applied = 0;
        for entry in self.cache.iter() {
            applied += entry.txn.commit()?;
        }
        tracing::debug!(applied, "committed staged mutations");
        Ok(applied)
    }

    /// Discard every cached repository's staged mutations
    pub fn rollback(&self) {
        for entry in self.cache.iter() {
            entry.txn.discard();
        }
    }

    /// Total staged mutations across all cached repositories
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.cache.iter().map(|entry| entry.txn.pending_count()).sum()
    }
}
