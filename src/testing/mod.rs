use sqlx::SqlitePool;

use crate::config::DatabaseConfig;
use crate::database::models::{Country, Role, State, User};
use crate::database::repositories::{CountryRepository, StateRepository, UserRepository};
use crate::database::DatabaseManager;

/// A migrated, private in-memory database for one test.
pub struct TestContext {
    pub pool: SqlitePool,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        let pool = DatabaseManager::connect(&DatabaseConfig::in_memory()).await?;
        DatabaseManager::migrate(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn create_user(&self, email: &str, role: Role) -> anyhow::Result<User> {
        let user = User::new(email, "Test User", role);
        Ok(UserRepository::new().create(&self.pool, &user).await?)
    }

    pub async fn create_country(&self, code: &str, name: &str) -> anyhow::Result<Country> {
        let country = Country::new(code, name, None);
        Ok(CountryRepository::new().create(&self.pool, &country).await?)
    }

    pub async fn create_state(&self, country_id: i64, code: &str, name: &str) -> anyhow::Result<State> {
        let state = State::new(country_id, code, name);
        Ok(StateRepository::new().create(&self.pool, &state).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn contexts_are_isolated() -> anyhow::Result<()> {
        let first = TestContext::new().await?;
        let second = TestContext::new().await?;
        first.create_country("CO", "Colombia").await?;

        let countries = CountryRepository::new();
        assert_eq!(countries.count(&first.pool, countries.filter()?).await?, 1);
        assert_eq!(countries.count(&second.pool, countries.filter()?).await?, 0);
        Ok(())
    }
}
