use serde_json::Value;
use sqlx::{
    self,
    query::QueryAs,
    sqlite::{SqliteArguments, SqliteRow},
    Executor, FromRow, Sqlite,
};

use crate::database::entity::Entity;
use crate::database::repository::RepositoryError;
use crate::filter::Filter;

/// Executes a [`Filter`] against the store and decodes rows as `T`.
pub struct QueryBuilder<T> {
    filter: Filter,
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<T: Entity> QueryBuilder<T> {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn select_all<'e, E>(self, executor: E) -> Result<Vec<T>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql_result = self.filter.to_sql()?;
        tracing::debug!(table = T::TABLE, sql = %sql_result.query, "select");
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params {
            q = bind_value(q, p);
        }
        let rows = q.fetch_all(executor).await.map_err(RepositoryError::from)?;
        Ok(rows)
    }

    pub async fn select_optional<'e, E>(self, executor: E) -> Result<Option<T>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql_result = self.filter.to_sql()?;
        tracing::debug!(table = T::TABLE, sql = %sql_result.query, "select optional");
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params {
            q = bind_value(q, p);
        }
        let row = q.fetch_optional(executor).await.map_err(RepositoryError::from)?;
        Ok(row)
    }

    pub async fn count<'e, E>(self, executor: E) -> Result<i64, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql_result = self.filter.to_count_sql()?;
        tracing::debug!(table = T::TABLE, sql = %sql_result.query, "count");
        let mut q = sqlx::query_as::<_, (i64,)>(&sql_result.query);
        for p in sql_result.params {
            q = bind_value(q, p);
        }
        let (count,) = q.fetch_one(executor).await.map_err(RepositoryError::from)?;
        Ok(count)
    }
}

/// Binds one JSON value as a positional SQLite parameter.
pub(crate) fn bind_value<'q, O>(
    q: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    v: Value,
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>>
where
    O: for<'r> FromRow<'r, SqliteRow>,
{
    match v {
        Value::Null => q.bind(None::<String>),
        Value::Bool(b) => q.bind(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        // Stored as JSON text
        other @ (Value::Array(_) | Value::Object(_)) => q.bind(other.to_string()),
    }
}
