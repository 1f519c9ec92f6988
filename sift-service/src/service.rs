//! Entity service: queries and mutations behind one error boundary
//!
//! [`EntityService`] is the composition point: it resolves query text against
//! the property registry, executes plans over repository data, paginates, and
//! drives staged mutations through the unit of work.
//!
//! Every operation returns a [`ServiceResult`]. Deliberate failures
//! (validation, not-found, conflict) pass through with their messages.
//! Anything unexpected is logged with a correlation id and surfaced as a
//! generic internal error, so storage detail never reaches callers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::QueryConfig;
use crate::error::{Error, Result};
use crate::mapper::PropertyMapper;
use crate::query::{paginate_with, PagedList, QueryEngine, QueryModel, QueryResolver};
use crate::repository::{Entity, Repository, UnitOfWork};
use crate::result::{ServiceResult, StatusHint};

/// Query and mutation operations for one entity type
pub struct EntityService<T: Entity> {
    unit_of_work: Arc<UnitOfWork>,
    mapper: Arc<PropertyMapper>,
    engine: Arc<QueryEngine<T>>,
    config: QueryConfig,
}

impl<T: Entity> EntityService<T> {
    /// Compose a service over shared pipeline components
    #[must_use]
    pub fn new(
        unit_of_work: Arc<UnitOfWork>,
        mapper: Arc<PropertyMapper>,
        engine: Arc<QueryEngine<T>>,
        config: QueryConfig,
    ) -> Self {
        Self {
            unit_of_work,
            mapper,
            engine,
            config,
        }
    }

    /// Fetch one record by primary key
    pub async fn get_by_id(&self, id: &T::Id) -> ServiceResult<T> {
        self.guard("get_by_id", StatusHint::Ok, self.try_get_by_id(id).await)
    }

    /// Run a search and return one page of projected results
    ///
    /// The projection runs only over the items of the returned page. The
    /// envelope's total count is the number of records matching the filter,
    /// not the size of the unfiltered sequence.
    pub async fn search<U>(
        &self,
        model: &QueryModel,
        project: impl FnMut(T) -> U,
    ) -> ServiceResult<PagedList<U>> {
        self.guard("search", StatusHint::Ok, self.try_search(model, project).await)
    }

    /// Run a search returning full records, no projection
    pub async fn paged_data(&self, model: &QueryModel) -> ServiceResult<PagedList<T>> {
        self.search(model, |record| record).await
    }

    /// Stage an insertion without saving
    pub async fn add(&self, entity: T) -> ServiceResult<()> {
        self.guard("add", StatusHint::Ok, self.try_add(entity).await)
    }

    /// Stage an insertion and commit immediately
    ///
    /// Fails with a conflict when a record with the same key already exists;
    /// nothing is committed in that case.
    pub async fn add_and_save(&self, entity: T, token: &CancellationToken) -> ServiceResult<T> {
        self.guard(
            "add_and_save",
            StatusHint::Created,
            self.try_add_and_save(entity, token).await,
        )
    }

    /// Replace an existing record and commit immediately
    ///
    /// Fails with not-found when no record has the entity's key; the save is
    /// skipped entirely in that case.
    pub async fn update_and_save(&self, entity: T, token: &CancellationToken) -> ServiceResult<T> {
        self.guard(
            "update_and_save",
            StatusHint::Ok,
            self.try_update_and_save(entity, token).await,
        )
    }

    /// Remove a record by key and commit immediately
    ///
    /// Fails with not-found when no record has that key; the save is skipped
    /// entirely in that case.
    pub async fn delete_and_save(&self, id: &T::Id, token: &CancellationToken) -> ServiceResult<()> {
        self.guard(
            "delete_and_save",
            StatusHint::NoContent,
            self.try_delete_and_save(id, token).await,
        )
    }

    /// Commit every staged mutation in the current scope
    pub async fn save_changes(&self, token: &CancellationToken) -> ServiceResult<u64> {
        self.guard(
            "save_changes",
            StatusHint::Ok,
            self.unit_of_work.save_changes(token).await,
        )
    }

    /// Discard every staged mutation in the current scope
    pub fn rollback(&self) {
        self.unit_of_work.rollback();
    }

    async fn try_get_by_id(&self, id: &T::Id) -> Result<T> {
        let repo = self.unit_of_work.repository::<T>()?;
        repo.find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{} {} not found", T::NAME, id)))
    }

    async fn try_search<U>(
        &self,
        model: &QueryModel,
        project: impl FnMut(T) -> U,
    ) -> Result<PagedList<U>> {
        let resolver = QueryResolver::new(&self.mapper, self.config.unknown_property);
        let (filter_plan, sort_plan) =
            resolver.resolve::<T>(model.filter_text(), model.sort_text())?;

        let repo = self.unit_of_work.repository::<T>()?;
        let rows = repo.find_all().await?;
        let (matched, total) = self.engine.execute(rows, &filter_plan, &sort_plan);

        tracing::debug!(
            entity = T::NAME,
            total,
            filters = model.filter_text(),
            sorts = model.sort_text(),
            "query executed"
        );

        Ok(paginate_with(
            matched,
            total as u64,
            model.page,
            model.page_size,
            &self.config,
            project,
        ))
    }

    async fn try_add(&self, entity: T) -> Result<()> {
        let repo = self.unit_of_work.repository::<T>()?;
        repo.add(entity).await?;
        Ok(())
    }

    async fn try_add_and_save(&self, entity: T, token: &CancellationToken) -> Result<T> {
        let repo = self.unit_of_work.repository::<T>()?;
        let id = entity.id();
        if repo.exists(&id).await? {
            return Err(Error::Conflict(format!("{} {} already exists", T::NAME, id)));
        }
        repo.add(entity.clone()).await?;
        self.unit_of_work.save_changes(token).await?;
        Ok(entity)
    }

    async fn try_update_and_save(&self, entity: T, token: &CancellationToken) -> Result<T> {
        let repo = self.unit_of_work.repository::<T>()?;
        let id = entity.id();
        if !repo.exists(&id).await? {
            return Err(Error::NotFound(format!("{} {} not found", T::NAME, id)));
        }
        repo.update(entity.clone()).await?;
        self.unit_of_work.save_changes(token).await?;
        Ok(entity)
    }

    async fn try_delete_and_save(&self, id: &T::Id, token: &CancellationToken) -> Result<()> {
        let repo = self.unit_of_work.repository::<T>()?;
        if !repo.exists(id).await? {
            return Err(Error::NotFound(format!("{} {} not found", T::NAME, id)));
        }
        repo.delete(id).await?;
        self.unit_of_work.save_changes(token).await?;
        Ok(())
    }

    /// The outer error boundary for every operation
    ///
    /// Deliberate failures pass through. Everything else is logged with a
    /// correlation id and replaced by a generic internal error.
    fn guard<V>(
        &self,
        operation: &'static str,
        success: StatusHint,
        result: Result<V>,
    ) -> ServiceResult<V> {
        match result {
            Ok(value) => ServiceResult::success_with(value, success),
            Err(error @ (Error::Validation(_) | Error::NotFound(_) | Error::Conflict(_))) => {
                ServiceResult::failure(error)
            }
            Err(error) => {
                let correlation_id = Uuid::new_v4();
                tracing::error!(
                    %correlation_id,
                    entity = T::NAME,
                    operation,
                    error = %error,
                    "unexpected failure"
                );
                ServiceResult::failure(Error::Internal(correlation_id.to_string()))
            }
        }
    }
}
