use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{self, Acquire, Executor, Sqlite};
use thiserror::Error;

use crate::database::entity::Entity;
use crate::database::patch::{Patch, PatchError};
use crate::database::query_builder::{bind_value, QueryBuilder};
use crate::filter::{Filter, FilterError, SortDirection};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Duplicate value in {table} ({})", .columns.join(", "))]
    UniqueViolation { table: String, columns: Vec<String> },

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let (table, columns) = parse_unique_violation(db_err.message());
                return RepositoryError::UniqueViolation { table, columns };
            }
            if db_err.is_foreign_key_violation() {
                return RepositoryError::ForeignKeyViolation(db_err.message().to_string());
            }
        }
        RepositoryError::Sqlx(err)
    }
}

/// Splits `UNIQUE constraint failed: states.country_id, states.code` into the
/// table and its columns. Index-named failures yield the index name as column.
fn parse_unique_violation(message: &str) -> (String, Vec<String>) {
    let detail = message
        .split_once("failed:")
        .map(|(_, rest)| rest.trim())
        .unwrap_or(message);

    if let Some(index) = detail.strip_prefix("index ") {
        return (String::new(), vec![index.trim_matches('\'').to_string()]);
    }

    let mut table = String::new();
    let mut columns = Vec::new();
    for part in detail.split(',') {
        match part.trim().split_once('.') {
            Some((t, c)) => {
                table = t.to_string();
                columns.push(c.to_string());
            }
            None => columns.push(part.trim().to_string()),
        }
    }
    (table, columns)
}

/// Paging, search and ordering for [`Repository::list`].
#[derive(Debug, Clone)]
pub struct ListOptions {
    pub skip: i64,
    pub limit: i64,
    pub active_only: bool,
    pub search: Option<String>,
    pub order_by: Option<String>,
    pub direction: SortDirection,
    pub filters: Vec<(&'static str, Value)>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 20,
            active_only: false,
            search: None,
            order_by: None,
            direction: SortDirection::Asc,
            filters: vec![],
        }
    }
}

impl ListOptions {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit, ..Default::default() }
    }

    pub fn filter_by(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filters.push((column, value.into()));
        self
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Generic CRUD access over one entity table.
///
/// Every read goes through [`Filter`], which always carries the
/// `is_deleted = 0` predicate. Writes stamp the audit columns.
pub struct Repository<T> {
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Repository<T> {}

impl<T> Default for Repository<T> {
    fn default() -> Self {
        Self { _phantom: std::marker::PhantomData }
    }
}

impl<T> std::fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository").finish()
    }
}

impl<T: Entity> Repository<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A filter over visible rows of `T`, restricted to its known columns.
    pub fn filter(&self) -> Result<Filter, RepositoryError> {
        Ok(Filter::new(T::TABLE)?.with_columns(T::known_columns()))
    }

    /// Inserts `record`. The store assigns `id`, both timestamps are stamped
    /// now and `is_deleted` is forced to false.
    pub async fn create<'e, E>(&self, db: E, record: &T) -> Result<T, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let values = to_object::<T>(record)?;
        let now = Utc::now();

        let mut columns: Vec<&str> = T::COLUMNS.to_vec();
        columns.push("is_active");

        let column_list = columns
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO \"{}\" ({}, \"is_deleted\", \"created_at\", \"updated_at\") VALUES ({}, 0, ?, ?) RETURNING *",
            T::TABLE,
            column_list,
            placeholders
        );

        let mut q = sqlx::query_as::<_, T>(&sql);
        for column in &columns {
            q = bind_value(q, values.get(*column).cloned().unwrap_or(Value::Null));
        }
        q = q.bind(now).bind(now);

        let created = q.fetch_one(db).await?;
        tracing::debug!(table = T::TABLE, id = created.id(), "inserted");
        Ok(created)
    }

    pub async fn get_by_id<'e, E>(&self, db: E, id: i64) -> Result<Option<T>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut filter = self.filter()?;
        filter.where_eq("id", id)?;
        QueryBuilder::<T>::new(filter).select_optional(db).await
    }

    /// Visible rows in id order. `limit` must be positive.
    pub async fn get_all<'e, E>(&self, db: E, skip: i64, limit: i64) -> Result<Vec<T>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let (limit, skip) = check_pagination(skip, limit)?;
        let mut filter = self.filter()?;
        filter.limit(limit, skip)?;
        QueryBuilder::<T>::new(filter).select_all(db).await
    }

    pub async fn find<'e, E>(&self, db: E, filter: Filter) -> Result<Vec<T>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        QueryBuilder::<T>::new(filter).select_all(db).await
    }

    pub async fn find_one<'e, E>(&self, db: E, mut filter: Filter) -> Result<Option<T>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        filter.limit(1, 0)?;
        QueryBuilder::<T>::new(filter).select_optional(db).await
    }

    pub async fn count<'e, E>(&self, db: E, filter: Filter) -> Result<i64, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        QueryBuilder::<T>::new(filter).count(db).await
    }

    /// One page of visible rows plus the total matching count.
    pub async fn list<'a, A>(&self, db: A, options: &ListOptions) -> Result<Page<T>, RepositoryError>
    where
        A: Acquire<'a, Database = Sqlite>,
    {
        let (limit, skip) = check_pagination(options.skip, options.limit)?;

        let mut filter = self.filter()?;
        if options.active_only {
            filter.where_eq("is_active", true)?;
        }
        for (column, value) in &options.filters {
            filter.where_eq(column, value.clone())?;
        }
        if let Some(term) = options.search.as_deref() {
            if !T::SEARCH_COLUMNS.is_empty() {
                filter.search(T::SEARCH_COLUMNS, term)?;
            }
        }
        if let Some(order_by) = options.order_by.as_deref() {
            filter.order(order_by, options.direction)?;
        }

        let count_filter = filter.clone();
        filter.limit(limit, skip)?;

        let mut conn = db.acquire().await?;
        let total = QueryBuilder::<T>::new(count_filter).count(&mut *conn).await?;
        let items = QueryBuilder::<T>::new(filter).select_all(&mut *conn).await?;
        Ok(Page { items, total })
    }

    /// Applies `patch` to `record` and persists only the patched columns
    /// plus `updated_at`. A row deleted in the meantime yields `NotFound`.
    pub async fn update<'e, E>(&self, db: E, record: &T, patch: &Patch) -> Result<T, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if patch.is_empty() {
            return Ok(record.clone());
        }

        let mut updated = patch.apply_to(record)?;
        let stamp = updated.audit_mut().touch();
        let values = to_object::<T>(&updated)?;

        let keys: Vec<&str> = patch.keys().collect();
        let assignments = keys
            .iter()
            .map(|k| format!("\"{}\" = ?", k))
            .chain(std::iter::once("\"updated_at\" = ?".to_string()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE \"{}\" SET {} WHERE \"id\" = ? AND \"is_deleted\" = 0 RETURNING *",
            T::TABLE,
            assignments
        );

        let mut q = sqlx::query_as::<_, T>(&sql);
        for key in &keys {
            q = bind_value(q, values.get(*key).cloned().unwrap_or(Value::Null));
        }
        q = q.bind(stamp).bind(record.id());

        let row = q.fetch_optional(db).await?;
        let row = row.ok_or(RepositoryError::NotFound { entity: T::NAME, id: record.id() })?;
        tracing::debug!(table = T::TABLE, id = row.id(), fields = ?keys, "updated");
        Ok(row)
    }

    /// Soft-deletes `record`. Deleting an already deleted record succeeds
    /// without touching it. Returns false when the row no longer exists.
    pub async fn delete<'e, E>(&self, db: E, record: &mut T) -> Result<bool, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if record.audit().is_deleted {
            return Ok(true);
        }
        match self.soft_delete(db, record.id()).await? {
            Some(updated_at) => {
                let audit = record.audit_mut();
                audit.is_deleted = true;
                audit.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Soft-deletes by id. True when a row with that id exists, whether it
    /// was deleted now or earlier.
    pub async fn delete_by_id<'e, E>(&self, db: E, id: i64) -> Result<bool, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        Ok(self.soft_delete(db, id).await?.is_some())
    }

    async fn soft_delete<'e, E>(&self, db: E, id: i64) -> Result<Option<DateTime<Utc>>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "UPDATE \"{}\" SET \"updated_at\" = CASE WHEN \"is_deleted\" = 0 THEN MAX(?, \"created_at\") ELSE \"updated_at\" END, \"is_deleted\" = 1 WHERE \"id\" = ? RETURNING \"updated_at\"",
            T::TABLE
        );
        let row = sqlx::query_as::<_, (DateTime<Utc>,)>(&sql)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(db)
            .await?;
        if row.is_some() {
            tracing::debug!(table = T::TABLE, id, "soft deleted");
        }
        Ok(row.map(|(updated_at,)| updated_at))
    }
}

fn check_pagination(skip: i64, limit: i64) -> Result<(u32, u32), RepositoryError> {
    if limit <= 0 {
        return Err(RepositoryError::InvalidPagination("limit must be positive".to_string()));
    }
    if skip < 0 {
        return Err(RepositoryError::InvalidPagination("skip must not be negative".to_string()));
    }
    let limit = u32::try_from(limit)
        .map_err(|_| RepositoryError::InvalidPagination("limit is too large".to_string()))?;
    let skip = u32::try_from(skip)
        .map_err(|_| RepositoryError::InvalidPagination("skip is too large".to_string()))?;
    Ok((limit, skip))
}

fn to_object<T: Entity>(record: &T) -> Result<Map<String, Value>, RepositoryError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(PatchError::InvalidJson(format!("{} must serialize to an object", T::NAME)).into()),
        Err(e) => Err(PatchError::InvalidJson(e.to_string()).into()),
    }
}
