use sqlx::{Executor, Sqlite};

use crate::database::models::State;
use crate::database::{Repository, RepositoryError};
use crate::filter::SortDirection;

#[derive(Debug, Clone, Copy, Default)]
pub struct StateRepository {
    base: Repository<State>,
}

deref_repository!(StateRepository, State);

impl StateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_by_code<'e, E>(
        &self,
        db: E,
        country_id: i64,
        code: &str,
    ) -> Result<Option<State>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut filter = self.base.filter()?;
        filter
            .where_eq("country_id", country_id)?
            .where_eq("code", code.trim().to_uppercase())?;
        self.base.find_one(db, filter).await
    }

    pub async fn get_by_country<'e, E>(&self, db: E, country_id: i64) -> Result<Vec<State>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut filter = self.base.filter()?;
        filter.where_eq("country_id", country_id)?.order("name", SortDirection::Asc)?;
        self.base.find(db, filter).await
    }

    pub async fn count_by_country<'e, E>(&self, db: E, country_id: i64) -> Result<i64, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut filter = self.base.filter()?;
        filter.where_eq("country_id", country_id)?;
        self.base.count(db, filter).await
    }

    /// Includes soft-deleted rows. Only the seed loader needs this.
    pub(crate) async fn get_by_code_any<'e, E>(
        &self,
        db: E,
        country_id: i64,
        code: &str,
    ) -> Result<Option<State>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut filter = self.base.filter()?;
        filter
            .include_deleted()
            .where_eq("country_id", country_id)?
            .where_eq("code", code.trim().to_uppercase())?;
        self.base.find_one(db, filter).await
    }
}
