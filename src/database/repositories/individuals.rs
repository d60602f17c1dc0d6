use sqlx::{Executor, Sqlite};

use crate::database::models::{Individual, IndividualStatus};
use crate::database::{Repository, RepositoryError};
use crate::filter::SortDirection;

#[derive(Debug, Clone, Copy, Default)]
pub struct IndividualRepository {
    base: Repository<Individual>,
}

deref_repository!(IndividualRepository, Individual);

impl IndividualRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_by_document_number<'e, E>(
        &self,
        db: E,
        document_number: &str,
    ) -> Result<Option<Individual>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut filter = self.base.filter()?;
        filter.where_eq("document_number", document_number.trim())?;
        self.base.find_one(db, filter).await
    }

    pub async fn get_by_user<'e, E>(&self, db: E, user_id: i64) -> Result<Option<Individual>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut filter = self.base.filter()?;
        filter.where_eq("user_id", user_id)?;
        self.base.find_one(db, filter).await
    }

    pub async fn get_by_state<'e, E>(&self, db: E, state_id: i64) -> Result<Vec<Individual>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut filter = self.base.filter()?;
        filter.where_eq("state_id", state_id)?;
        self.base.find(db, filter).await
    }

    pub async fn get_by_status<'e, E>(
        &self,
        db: E,
        status: IndividualStatus,
    ) -> Result<Vec<Individual>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut filter = self.base.filter()?;
        filter.where_eq("status", status.as_str())?;
        self.base.find(db, filter).await
    }

    /// Visible profiles whose `column` points at `id`. Used to keep owners
    /// and locations from being deleted underneath a profile.
    pub async fn count_referencing<'e, E>(
        &self,
        db: E,
        column: &'static str,
        id: i64,
    ) -> Result<i64, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut filter = self.base.filter()?;
        filter.where_eq(column, id)?;
        self.base.count(db, filter).await
    }

    /// Matches names and document number, ordered by last then first name.
    pub async fn search<'e, E>(&self, db: E, term: &str) -> Result<Vec<Individual>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut filter = self.base.filter()?;
        filter
            .search(&["first_name", "last_name", "document_number"], term)?
            .order("last_name", SortDirection::Asc)?
            .order("first_name", SortDirection::Asc)?;
        self.base.find(db, filter).await
    }
}
