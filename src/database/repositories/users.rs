use sqlx::{Executor, Sqlite};

use crate::database::models::User;
use crate::database::{Repository, RepositoryError};

#[derive(Debug, Clone, Copy, Default)]
pub struct UserRepository {
    base: Repository<User>,
}

deref_repository!(UserRepository, User);

impl UserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive lookup; emails are stored lowercased.
    pub async fn get_by_email<'e, E>(&self, db: E, email: &str) -> Result<Option<User>, RepositoryError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let mut filter = self.base.filter()?;
        filter.where_eq("email", email.trim().to_lowercase())?;
        self.base.find_one(db, filter).await
    }
}
