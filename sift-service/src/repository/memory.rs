//! In-memory storage backend
//!
//! [`MemoryStore`] holds one table per entity type, keyed by `TypeId`.
//! Tables are `BTreeMap`s over the primary key, so iteration is always
//! primary-key-ascending; that order is the natural order repositories
//! return and the final tie-break for sorted queries.
//!
//! [`MemoryRepository`] gives one entity type a view over its table plus a
//! journal of staged mutations. Reads see only committed state; the journal
//! is applied all-or-nothing when the owning unit of work saves.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, RwLock};

use dashmap::DashMap;

use crate::error::{StorageError, StorageOperation};

use super::traits::{Entity, Repository, StorageResult, Transactional};

type Table<T> = RwLock<BTreeMap<<T as Entity>::Id, T>>;

/// Shared in-memory storage, one table per entity type
#[derive(Default)]
pub struct MemoryStore {
    tables: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch or create the table for entity type `T`
    fn table<T: Entity>(&self) -> Arc<Table<T>> {
        let entry = self
            .tables
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(RwLock::new(BTreeMap::<T::Id, T>::new())))
            .clone();
        // The entry for T's TypeId is only ever created above with T's table
        // type, so the downcast cannot fail.
        entry
            .downcast::<Table<T>>()
            .expect("table stored under its own TypeId")
    }

    /// Insert committed rows directly, bypassing the journal
    ///
    /// Intended for seeding fixtures and initial data sets at startup.
    pub fn seed<T: Entity>(&self, rows: impl IntoIterator<Item = T>) -> StorageResult<()> {
        let table = self.table::<T>();
        let mut guard = table
            .write()
            .map_err(|_| poisoned(StorageOperation::Add, T::NAME))?;
        for row in rows {
            guard.insert(row.id(), row);
        }
        Ok(())
    }
}

/// One staged mutation awaiting commit
enum PendingOp<T: Entity> {
    Insert(T),
    Replace(T),
    Remove(T::Id),
}

/// Repository over one [`MemoryStore`] table with a staged-mutation journal
pub struct MemoryRepository<T: Entity> {
    table: Arc<Table<T>>,
    pending: Mutex<Vec<PendingOp<T>>>,
}

impl<T: Entity> MemoryRepository<T> {
    /// Open a repository over the store's table for `T`
    #[must_use]
    pub fn new(store: &MemoryStore) -> Self {
        Self {
            table: store.table::<T>(),
            pending: Mutex::new(Vec::new()),
        }
    }

    fn read_table(
        &self,
        operation: StorageOperation,
    ) -> StorageResult<std::sync::RwLockReadGuard<'_, BTreeMap<T::Id, T>>> {
        self.table.read().map_err(|_| poisoned(operation, T::NAME))
    }

    fn stage(&self, op: PendingOp<T>, operation: StorageOperation) -> StorageResult<()> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| poisoned(operation, T::NAME))?;
        pending.push(op);
        Ok(())
    }
}

impl<T: Entity> Repository<T> for MemoryRepository<T> {
    async fn find_by_id(&self, id: &T::Id) -> StorageResult<Option<T>> {
        Ok(self.read_table(StorageOperation::FindById)?.get(id).cloned())
    }

    async fn find_all(&self) -> StorageResult<Vec<T>> {
        // BTreeMap iteration gives primary-key-ascending order.
        Ok(self
            .read_table(StorageOperation::FindAll)?
            .values()
            .cloned()
            .collect())
    }

    async fn count(&self) -> StorageResult<u64> {
        Ok(self.read_table(StorageOperation::Count)?.len() as u64)
    }

    async fn exists(&self, id: &T::Id) -> StorageResult<bool> {
        Ok(self.read_table(StorageOperation::Exists)?.contains_key(id))
    }

    async fn add(&self, entity: T) -> StorageResult<()> {
        self.stage(PendingOp::Insert(entity), StorageOperation::Add)
    }

    async fn update(&self, entity: T) -> StorageResult<()> {
        self.stage(PendingOp::Replace(entity), StorageOperation::Update)
    }

    async fn delete(&self, id: &T::Id) -> StorageResult<()> {
        self.stage(PendingOp::Remove(id.clone()), StorageOperation::Delete)
    }
}

/// Check a batch against a simulated key set without touching any row
///
/// Insertions must not collide, replacements and removals must target an
/// existing key, and later ops see the effect of earlier ones in the batch.
fn validate_batch<T: Entity>(
    pending: &[PendingOp<T>],
    table: &BTreeMap<T::Id, T>,
) -> StorageResult<()> {
    let mut keys: BTreeSet<T::Id> = table.keys().cloned().collect();
    for op in pending {
        match op {
            PendingOp::Insert(entity) => {
                let id = entity.id();
                if !keys.insert(id.clone()) {
                    return Err(StorageError::new(
                        StorageOperation::Save,
                        "cannot insert: key already exists",
                    )
                    .with_entity(T::NAME, id.to_string()));
                }
            }
            PendingOp::Replace(entity) => {
                let id = entity.id();
                if !keys.contains(&id) {
                    return Err(StorageError::new(
                        StorageOperation::Save,
                        "cannot update: no record with key",
                    )
                    .with_entity(T::NAME, id.to_string()));
                }
            }
            PendingOp::Remove(id) => {
                if !keys.remove(id) {
                    return Err(StorageError::new(
                        StorageOperation::Save,
                        "cannot delete: no record with key",
                    )
                    .with_entity(T::NAME, id.to_string()));
                }
            }
        }
    }
    Ok(())
}

impl<T: Entity> Transactional for MemoryRepository<T> {
    fn pending_count(&self) -> usize {
        self.pending.lock().map(|ops| ops.len()).unwrap_or(0)
    }

    fn validate(&self) -> StorageResult<()> {
        let pending = self
            .pending
            .lock()
            .map_err(|_| poisoned(StorageOperation::Save, T::NAME))?;
        if pending.is_empty() {
            return Ok(());
        }
        let table = self
            .table
            .read()
            .map_err(|_| poisoned(StorageOperation::Save, T::NAME))?;
        validate_batch(&pending, &table)
    }

    fn commit(&self) -> StorageResult<u64> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| poisoned(StorageOperation::Save, T::NAME))?;
        if pending.is_empty() {
            return Ok(0);
        }

        let mut table = self
            .table
            .write()
            .map_err(|_| poisoned(StorageOperation::Save, T::NAME))?;

        // A failed batch leaves the table untouched.
        validate_batch(&pending, &table)?;

        let applied = pending.len() as u64;
        for op in pending.drain(..) {
            match op {
                PendingOp::Insert(entity) | PendingOp::Replace(entity) => {
                    table.insert(entity.id(), entity);
                }
                PendingOp::Remove(id) => {
                    table.remove(&id);
                }
            }
        }
        Ok(applied)
    }

    fn discard(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.clear();
        }
    }
}

fn poisoned(operation: StorageOperation, entity: &str) -> StorageError {
    StorageError::new(operation, format!("storage lock poisoned for {entity}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{FilterValue, Queryable};

    #[derive(Debug, Clone, PartialEq)]
    struct Widget {
        id: i64,
        name: String,
    }

    impl Widget {
        fn new(id: i64, name: &str) -> Self {
            Self {
                id,
                name: name.to_string(),
            }
        }
    }

    impl Queryable for Widget {
        fn field(&self, property: &str) -> Option<FilterValue> {
            match property {
                "id" => Some(self.id.into()),
                "name" => Some(self.name.clone().into()),
                _ => None,
            }
        }
    }

    impl Entity for Widget {
        type Id = i64;
        const NAME: &'static str = "Widget";

        fn id(&self) -> i64 {
            self.id
        }
    }

    fn seeded_repo() -> MemoryRepository<Widget> {
        let store = MemoryStore::new();
        store
            .seed([Widget::new(3, "gear"), Widget::new(1, "cog"), Widget::new(2, "bolt")])
            .unwrap();
        MemoryRepository::new(&store)
    }

    #[tokio::test]
    async fn test_find_all_is_primary_key_ascending() {
        let repo = seeded_repo();
        let rows = repo.find_all().await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_find_by_id_and_exists() {
        let repo = seeded_repo();
        assert_eq!(repo.find_by_id(&2).await.unwrap().unwrap().name, "bolt");
        assert!(repo.find_by_id(&99).await.unwrap().is_none());
        assert!(repo.exists(&1).await.unwrap());
        assert!(!repo.exists(&99).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_mutations_invisible_until_commit() {
        let repo = seeded_repo();
        repo.add(Widget::new(4, "axle")).await.unwrap();
        repo.delete(&1).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 3);
        assert!(repo.find_by_id(&4).await.unwrap().is_none());
        assert_eq!(repo.pending_count(), 2);

        assert_eq!(repo.commit().unwrap(), 2);
        assert_eq!(repo.count().await.unwrap(), 3);
        assert!(repo.find_by_id(&4).await.unwrap().is_some());
        assert!(repo.find_by_id(&1).await.unwrap().is_none());
        assert_eq!(repo.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_batch_touches_nothing() {
        let repo = seeded_repo();
        repo.add(Widget::new(4, "axle")).await.unwrap();
        // Key 1 already exists, so the whole batch must fail.
        repo.add(Widget::new(1, "dup")).await.unwrap();

        let err = repo.commit().unwrap_err();
        assert_eq!(err.operation, StorageOperation::Save);
        assert_eq!(err.entity_id.as_deref(), Some("1"));

        assert_eq!(repo.count().await.unwrap(), 3);
        assert!(repo.find_by_id(&4).await.unwrap().is_none());
        // The batch stays staged for inspection or discard.
        assert_eq!(repo.pending_count(), 2);
    }

    #[tokio::test]
    async fn test_validate_reports_without_applying() {
        let repo = seeded_repo();
        repo.add(Widget::new(4, "axle")).await.unwrap();
        assert!(repo.validate().is_ok());

        repo.update(Widget::new(99, "ghost")).await.unwrap();
        let err = repo.validate().unwrap_err();
        assert!(err.message.contains("cannot update"));

        // Validation never applies anything.
        assert_eq!(repo.count().await.unwrap(), 3);
        assert_eq!(repo.pending_count(), 2);
    }

    #[tokio::test]
    async fn test_update_requires_existing_key() {
        let repo = seeded_repo();
        repo.update(Widget::new(99, "ghost")).await.unwrap();
        let err = repo.commit().unwrap_err();
        assert!(err.message.contains("cannot update"));
    }

    #[tokio::test]
    async fn test_batch_sees_its_own_earlier_ops() {
        let repo = seeded_repo();
        // Insert then update of the same new key is valid within one batch.
        repo.add(Widget::new(4, "axle")).await.unwrap();
        repo.update(Widget::new(4, "axle mk2")).await.unwrap();
        assert_eq!(repo.commit().unwrap(), 2);
        assert_eq!(repo.find_by_id(&4).await.unwrap().unwrap().name, "axle mk2");
    }

    #[tokio::test]
    async fn test_discard_drops_the_journal() {
        let repo = seeded_repo();
        repo.add(Widget::new(4, "axle")).await.unwrap();
        repo.discard();
        assert_eq!(repo.pending_count(), 0);
        assert_eq!(repo.commit().unwrap(), 0);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_tables_are_isolated_per_type() {
        #[derive(Debug, Clone)]
        struct Gadget {
            id: i64,
        }
        impl Queryable for Gadget {
            fn field(&self, property: &str) -> Option<FilterValue> {
                (property == "id").then(|| self.id.into())
            }
        }
        impl Entity for Gadget {
            type Id = i64;
            const NAME: &'static str = "Gadget";
            fn id(&self) -> i64 {
                self.id
            }
        }

        let store = MemoryStore::new();
        store.seed([Widget::new(1, "cog")]).unwrap();
        store.seed([Gadget { id: 10 }]).unwrap();

        let widgets = MemoryRepository::<Widget>::new(&store);
        let gadgets = MemoryRepository::<Gadget>::new(&store);
        assert_eq!(widgets.count().await.unwrap(), 1);
        assert_eq!(gadgets.count().await.unwrap(), 1);
        assert!(widgets.find_by_id(&10).await.unwrap().is_none());
    }
}
