use sqlx::{Executor, Sqlite};

use crate::database::models::Country;
use crate::database::{Repository, RepositoryError};
use crate::filter::SortDirection;

#[derive(Debug, Clone, Copy, Default)]
pub struct CountryRepository {
    base: Repository<Country>,
}

deref_repository!(CountryRepository, Country);

impl CountryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_by_code<'e, E>(&self, db: E, code: &str) -> Result<Option<Country>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut filter = self.base.filter()?;
        filter.where_eq("code", code.trim().to_uppercase())?;
        self.base.find_one(db, filter).await
    }

    /// Countries whose code or name contains `term`, by name.
    pub async fn search<'e, E>(&self, db: E, term: &str) -> Result<Vec<Country>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut filter = self.base.filter()?;
        filter.search(&["code", "name"], term)?.order("name", SortDirection::Asc)?;
        self.base.find(db, filter).await
    }

    pub async fn list_active<'e, E>(&self, db: E) -> Result<Vec<Country>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut filter = self.base.filter()?;
        filter.where_eq("is_active", true)?.order("name", SortDirection::Asc)?;
        self.base.find(db, filter).await
    }

    /// Includes soft-deleted rows. Only the seed loader needs this.
    pub(crate) async fn get_by_code_any<'e, E>(&self, db: E, code: &str) -> Result<Option<Country>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut filter = self.base.filter()?;
        filter.include_deleted().where_eq("code", code.trim().to_uppercase())?;
        self.base.find_one(db, filter).await
    }
}
