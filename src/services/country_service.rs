use sqlx::SqlitePool;
use tracing::info;

use crate::database::models::{Country, CreateCountry, UpdateCountry};
use crate::database::repositories::{CountryRepository, IndividualRepository, StateRepository};
use crate::database::{Entity, ListOptions, Page, Patch};
use crate::services::error::ServiceError;
use crate::services::validation::Validator;

#[derive(Debug, Clone)]
pub struct CountryService {
    pool: SqlitePool,
    countries: CountryRepository,
    states: StateRepository,
    individuals: IndividualRepository,
}

impl CountryService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            countries: CountryRepository::new(),
            states: StateRepository::new(),
            individuals: IndividualRepository::new(),
        }
    }

    pub async fn create(&self, input: CreateCountry) -> Result<Country, ServiceError> {
        let mut v = Validator::new(Country::NAME);
        let code = normalize_code(&mut v, &input.code);
        let name = v.required("name", &input.name);
        let phone_code = v.optional(input.phone_code.as_deref());
        if let Some(phone_code) = phone_code.as_deref() {
            check_phone_code(&mut v, phone_code);
        }
        v.finish()?;

        if self.countries.get_by_code(&self.pool, &code).await?.is_some() {
            return Err(ServiceError::already_exists(Country::NAME, "code", code));
        }

        let mut record = Country::new(code, name, phone_code);
        record.audit.is_active = input.is_active.unwrap_or(true);
        let created = self.countries.create(&self.pool, &record).await?;
        info!(country_id = created.id, code = %created.code, "Created country");
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> Result<Country, ServiceError> {
        self.countries
            .get_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Country::NAME, id))
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Country, ServiceError> {
        self.countries
            .get_by_code(&self.pool, code)
            .await?
            .ok_or_else(|| ServiceError::not_found(Country::NAME, code.trim().to_uppercase()))
    }

    pub async fn list(&self, options: &ListOptions) -> Result<Page<Country>, ServiceError> {
        Ok(self.countries.list(&self.pool, options).await?)
    }

    pub async fn search(&self, term: &str) -> Result<Vec<Country>, ServiceError> {
        Ok(self.countries.search(&self.pool, term).await?)
    }

    pub async fn list_active(&self) -> Result<Vec<Country>, ServiceError> {
        Ok(self.countries.list_active(&self.pool).await?)
    }

    pub async fn update(&self, id: i64, changes: UpdateCountry) -> Result<Country, ServiceError> {
        let existing = self.get(id).await?;
        let mut v = Validator::new(Country::NAME);
        let mut patch = Patch::new();

        if let Some(code) = changes.code.as_deref() {
            let code = normalize_code(&mut v, code);
            if !v.has_errors() && code != existing.code {
                if self.countries.get_by_code(&self.pool, &code).await?.is_some() {
                    return Err(ServiceError::already_exists(Country::NAME, "code", code));
                }
                patch.set("code", code)?;
            }
        }
        if let Some(name) = changes.name.as_deref() {
            let name = v.required("name", name);
            patch.set("name", name)?;
        }
        if let Some(phone_code) = changes.phone_code {
            let phone_code = v.optional(phone_code.as_deref());
            if let Some(value) = phone_code.as_deref() {
                check_phone_code(&mut v, value);
            }
            patch.set("phone_code", phone_code)?;
        }
        if let Some(is_active) = changes.is_active {
            patch.set("is_active", is_active)?;
        }
        v.finish()?;

        let updated = self.countries.update(&self.pool, &existing, &patch).await?;
        info!(country_id = updated.id, fields = patch.len(), "Updated country");
        Ok(updated)
    }

    /// Soft-deletes a country no visible state or individual refers to.
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        if let Some(mut existing) = self.countries.get_by_id(&self.pool, id).await? {
            let states = self.states.count_by_country(&self.pool, id).await?;
            if states > 0 {
                return Err(ServiceError::invalid(
                    Country::NAME,
                    "states",
                    format!("country still has {} state(s); delete them first", states),
                ));
            }
            let residents = self.individuals.count_referencing(&self.pool, "country_id", id).await?;
            if residents > 0 {
                return Err(ServiceError::invalid(
                    Country::NAME,
                    "individuals",
                    format!("country is used by {} individual(s); reassign them first", residents),
                ));
            }
            self.countries.delete(&self.pool, &mut existing).await?;
            info!(country_id = id, "Deleted country");
            return Ok(());
        }
        if self.countries.delete_by_id(&self.pool, id).await? {
            Ok(())
        } else {
            Err(ServiceError::not_found(Country::NAME, id))
        }
    }
}

fn normalize_code(v: &mut Validator, code: &str) -> String {
    let code = v.required("code", code).to_uppercase();
    if !code.is_empty() && (code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic())) {
        v.error("code", "must be a two-letter ISO 3166-1 code");
    }
    code
}

fn check_phone_code(v: &mut Validator, phone_code: &str) {
    let valid = match phone_code.strip_prefix('+') {
        Some(digits) => (1..=4).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()),
        None => false,
    };
    v.check(valid, "phone_code", "must look like +57");
}
