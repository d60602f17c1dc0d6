use sqlx::SqlitePool;
use tracing::info;

use crate::database::models::{Country, CreateState, State, UpdateState};
use crate::database::repositories::{CountryRepository, IndividualRepository, StateRepository};
use crate::database::{Entity, ListOptions, Page, Patch};
use crate::services::error::ServiceError;
use crate::services::validation::Validator;

#[derive(Debug, Clone)]
pub struct StateService {
    pool: SqlitePool,
    countries: CountryRepository,
    states: StateRepository,
    individuals: IndividualRepository,
}

impl StateService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            countries: CountryRepository::new(),
            states: StateRepository::new(),
            individuals: IndividualRepository::new(),
        }
    }

    pub async fn create(&self, input: CreateState) -> Result<State, ServiceError> {
        let mut v = Validator::new(State::NAME);
        let code = normalize_code(&mut v, &input.code);
        let name = v.required("name", &input.name);
        if self.countries.get_by_id(&self.pool, input.country_id).await?.is_none() {
            v.error("country_id", format!("{} {} does not exist", Country::NAME, input.country_id));
        }
        v.finish()?;

        if self.states.get_by_code(&self.pool, input.country_id, &code).await?.is_some() {
            return Err(ServiceError::already_exists(State::NAME, "code", code));
        }

        let mut record = State::new(input.country_id, code, name);
        record.audit.is_active = input.is_active.unwrap_or(true);
        let created = self.states.create(&self.pool, &record).await?;
        info!(state_id = created.id, country_id = created.country_id, "Created state");
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> Result<State, ServiceError> {
        self.states
            .get_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(State::NAME, id))
    }

    pub async fn list(&self, options: &ListOptions) -> Result<Page<State>, ServiceError> {
        Ok(self.states.list(&self.pool, options).await?)
    }

    /// States of a visible country, by name.
    pub async fn list_by_country(&self, country_id: i64) -> Result<Vec<State>, ServiceError> {
        if self.countries.get_by_id(&self.pool, country_id).await?.is_none() {
            return Err(ServiceError::not_found(Country::NAME, country_id));
        }
        Ok(self.states.get_by_country(&self.pool, country_id).await?)
    }

    pub async fn update(&self, id: i64, changes: UpdateState) -> Result<State, ServiceError> {
        let existing = self.get(id).await?;
        let mut v = Validator::new(State::NAME);
        let mut patch = Patch::new();

        let country_id = changes.country_id.unwrap_or(existing.country_id);
        if country_id != existing.country_id {
            if self.countries.get_by_id(&self.pool, country_id).await?.is_none() {
                v.error("country_id", format!("{} {} does not exist", Country::NAME, country_id));
            }
            let residents = self.individuals.count_referencing(&self.pool, "state_id", id).await?;
            if residents > 0 {
                v.error("country_id", format!("state is used by {} individual(s)", residents));
            }
            patch.set("country_id", country_id)?;
        }

        let mut code = existing.code.clone();
        if let Some(input) = changes.code.as_deref() {
            code = normalize_code(&mut v, input);
            if code != existing.code {
                patch.set("code", code.clone())?;
            }
        }
        if let Some(name) = changes.name.as_deref() {
            let name = v.required("name", name);
            patch.set("name", name)?;
        }
        if let Some(is_active) = changes.is_active {
            patch.set("is_active", is_active)?;
        }
        v.finish()?;

        if patch.contains("country_id") || patch.contains("code") {
            if let Some(other) = self.states.get_by_code(&self.pool, country_id, &code).await? {
                if other.id != existing.id {
                    return Err(ServiceError::already_exists(State::NAME, "code", code));
                }
            }
        }

        let updated = self.states.update(&self.pool, &existing, &patch).await?;
        info!(state_id = updated.id, fields = patch.len(), "Updated state");
        Ok(updated)
    }

    /// Soft-deletes a state no visible individual lives in.
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        if self.states.get_by_id(&self.pool, id).await?.is_some() {
            let residents = self.individuals.count_referencing(&self.pool, "state_id", id).await?;
            if residents > 0 {
                return Err(ServiceError::invalid(
                    State::NAME,
                    "individuals",
                    format!("state is used by {} individual(s); reassign them first", residents),
                ));
            }
        }
        if self.states.delete_by_id(&self.pool, id).await? {
            info!(state_id = id, "Deleted state");
            Ok(())
        } else {
            Err(ServiceError::not_found(State::NAME, id))
        }
    }
}

fn normalize_code(v: &mut Validator, code: &str) -> String {
    let code = v.required("code", code).to_uppercase();
    if !code.is_empty() && (code.len() > 10 || !code.chars().all(|c| c.is_ascii_alphanumeric())) {
        v.error("code", "must be up to 10 letters or digits");
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{DocumentType, Individual};
    use crate::testing::TestContext;

    fn input(country_id: i64, code: &str, name: &str) -> CreateState {
        CreateState {
            country_id,
            code: code.to_string(),
            name: name.to_string(),
            is_active: None,
        }
    }

    #[tokio::test]
    async fn requires_a_visible_country() -> anyhow::Result<()> {
        let ctx = TestContext::new().await?;
        let service = StateService::new(ctx.pool.clone());

        match service.create(input(77, "ANT", "Antioquia")).await {
            Err(ServiceError::Validation { errors, .. }) => assert!(errors.contains_key("country_id")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(matches!(service.list_by_country(77).await, Err(ServiceError::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn code_is_unique_per_country() -> anyhow::Result<()> {
        let ctx = TestContext::new().await?;
        let co = ctx.create_country("CO", "Colombia").await?;
        let us = ctx.create_country("US", "United States").await?;
        let service = StateService::new(ctx.pool.clone());

        let ant = service.create(input(co.id, "ant", "Antioquia")).await?;
        assert_eq!(ant.code, "ANT");
        assert!(matches!(
            service.create(input(co.id, "ANT", "Again")).await,
            Err(ServiceError::AlreadyExists { .. })
        ));
        let moved = service.create(input(us.id, "ANT", "Antelope")).await?;

        let clash = UpdateState { country_id: Some(co.id), ..Default::default() };
        assert!(matches!(
            service.update(moved.id, clash).await,
            Err(ServiceError::AlreadyExists { .. })
        ));

        let names: Vec<_> = service.list_by_country(co.id).await?.into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Antioquia"]);
        Ok(())
    }

    #[tokio::test]
    async fn delete_is_idempotent() -> anyhow::Result<()> {
        let ctx = TestContext::new().await?;
        let co = ctx.create_country("CO", "Colombia").await?;
        let service = StateService::new(ctx.pool.clone());
        let state = service.create(input(co.id, "ANT", "Antioquia")).await?;

        service.delete(state.id).await?;
        service.delete(state.id).await?;
        assert!(service.list_by_country(co.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn states_in_use_stay_put() -> anyhow::Result<()> {
        let ctx = TestContext::new().await?;
        let co = ctx.create_country("CO", "Colombia").await?;
        let mx = ctx.create_country("MX", "México").await?;
        let service = StateService::new(ctx.pool.clone());
        let ant = service.create(input(co.id, "ANT", "Antioquia")).await?;

        let mut resident = Individual::new(DocumentType::NationalId, "100", "Ana", "Ruiz");
        resident.country_id = Some(co.id);
        resident.state_id = Some(ant.id);
        let mut resident = service.individuals.create(&ctx.pool, &resident).await?;

        match service.delete(ant.id).await {
            Err(ServiceError::Validation { errors, .. }) => assert!(errors.contains_key("individuals")),
            other => panic!("expected validation error, got {other:?}"),
        }
        let moved = UpdateState { country_id: Some(mx.id), ..Default::default() };
        assert!(matches!(service.update(ant.id, moved).await, Err(ServiceError::Validation { .. })));

        service.individuals.delete(&ctx.pool, &mut resident).await?;
        service.delete(ant.id).await?;
        Ok(())
    }
}
