use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::database::models::{
    Country, CreateIndividual, CreateIndividualWithUser, DocumentType, Individual,
    IndividualStatus, Role, State, UpdateIndividual, User,
};
use crate::database::repositories::{
    CountryRepository, IndividualRepository, StateRepository, UserRepository,
};
use crate::database::{Entity, ListOptions, Page, Patch, RepositoryError, UnitOfWork};
use crate::services::error::ServiceError;
use crate::services::user_service::{guard_role, UserService};
use crate::services::validation::Validator;

/// Which references of a profile a write has to verify.
#[derive(Debug, Clone, Copy)]
struct Touched {
    owner: bool,
    location: bool,
}

impl Touched {
    const ALL: Touched = Touched { owner: true, location: true };
}

#[derive(Debug, Clone)]
pub struct IndividualService {
    pool: SqlitePool,
    individuals: IndividualRepository,
    users: UserRepository,
    countries: CountryRepository,
    states: StateRepository,
}

impl IndividualService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            individuals: IndividualRepository::new(),
            users: UserRepository::new(),
            countries: CountryRepository::new(),
            states: StateRepository::new(),
        }
    }

    /// Creates a profile with no owner or with an existing, visible owner.
    pub async fn create(&self, input: CreateIndividual) -> Result<Individual, ServiceError> {
        let (mut v, record) = prepare(&input);
        self.check_references(&mut v, &record, Touched::ALL).await?;
        v.finish()?;

        if let Some(user_id) = record.user_id {
            if self.individuals.get_by_user(&self.pool, user_id).await?.is_some() {
                return Err(ServiceError::already_exists(Individual::NAME, "user_id", user_id));
            }
        }
        self.ensure_document_free(&record.document_number).await?;

        let created = self.individuals.create(&self.pool, &record).await?;
        info!(individual_id = created.id, user_id = ?created.user_id, "Created individual");
        Ok(created)
    }

    /// Creates the owning user and the profile atomically.
    pub async fn create_with_user(
        &self,
        actor: Role,
        input: CreateIndividualWithUser,
    ) -> Result<(User, Individual), ServiceError> {
        let user = UserService::prepare(&input.user)?;
        guard_role(actor, user.role)?;

        let (mut v, record) = prepare(&input.individual);
        if input.individual.user_id.is_some() {
            v.error("user_id", "must be omitted; the user is created together with the profile");
        }
        self.check_references(&mut v, &record, Touched::ALL).await?;
        v.finish()?;

        if self.users.get_by_email(&self.pool, &user.email).await?.is_some() {
            return Err(ServiceError::already_exists(User::NAME, "email", &user.email));
        }
        self.ensure_document_free(&record.document_number).await?;

        self.persist_with_user(&user, record).await
    }

    /// Writes owner then profile inside one unit of work. The owner is
    /// flushed first so its id can be used as the profile's foreign key.
    async fn persist_with_user(
        &self,
        user: &User,
        mut record: Individual,
    ) -> Result<(User, Individual), ServiceError> {
        let mut uow = UnitOfWork::begin(&self.pool, "create_individual_with_user").await?;

        let result = async {
            let owner = self.users.create(uow.conn(), user).await?;
            uow.flush().await?;
            record.user_id = Some(owner.id);
            let profile = self.individuals.create(uow.conn(), &record).await?;
            uow.flush().await?;
            Ok::<_, RepositoryError>((owner, profile))
        }
        .await;

        match result {
            Ok((owner, profile)) => {
                uow.commit().await?;
                info!(user_id = owner.id, individual_id = profile.id, "Created individual with user");
                Ok((owner, profile))
            }
            Err(err) => {
                warn!(error = %err, "Creating individual with user failed, rolling back");
                if let Err(rollback) = uow.rollback().await {
                    error!(error = %rollback, "Rollback of individual with user failed");
                }
                Err(err.into())
            }
        }
    }

    pub async fn get(&self, id: i64) -> Result<Individual, ServiceError> {
        self.individuals
            .get_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Individual::NAME, id))
    }

    pub async fn get_by_user(&self, user_id: i64) -> Result<Individual, ServiceError> {
        self.individuals
            .get_by_user(&self.pool, user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Individual::NAME, format!("user {}", user_id)))
    }

    pub async fn list(&self, options: &ListOptions) -> Result<Page<Individual>, ServiceError> {
        Ok(self.individuals.list(&self.pool, options).await?)
    }

    pub async fn search(&self, term: &str) -> Result<Vec<Individual>, ServiceError> {
        Ok(self.individuals.search(&self.pool, term).await?)
    }

    /// Profiles located in a visible state.
    pub async fn list_by_state(&self, state_id: i64) -> Result<Vec<Individual>, ServiceError> {
        if self.states.get_by_id(&self.pool, state_id).await?.is_none() {
            return Err(ServiceError::not_found(State::NAME, state_id));
        }
        Ok(self.individuals.get_by_state(&self.pool, state_id).await?)
    }

    pub async fn list_by_status(&self, status: &str) -> Result<Vec<Individual>, ServiceError> {
        let mut v = Validator::new(Individual::NAME);
        let status = v.choice::<IndividualStatus>("status", status);
        v.finish()?;
        match status {
            Some(status) => Ok(self.individuals.get_by_status(&self.pool, status).await?),
            None => Ok(vec![]),
        }
    }

    /// Partial update. Cross-field rules are checked on the merged record;
    /// references are only re-checked when the update moves them.
    pub async fn update(&self, id: i64, changes: UpdateIndividual) -> Result<Individual, ServiceError> {
        let existing = self.get(id).await?;
        let mut merged = existing.clone();
        let mut v = Validator::new(Individual::NAME);
        let mut patch = Patch::new();

        if let Some(user_id) = changes.user_id {
            merged.user_id = user_id;
            patch.set("user_id", user_id)?;
        }
        if let Some(document_type) = changes.document_type.as_deref() {
            if let Some(document_type) = v.choice::<DocumentType>("document_type", document_type) {
                merged.document_type = document_type;
                patch.set("document_type", document_type.as_str())?;
            }
        }
        if let Some(document_number) = changes.document_number.as_deref() {
            merged.document_number = v.required("document_number", document_number);
            patch.set("document_number", merged.document_number.clone())?;
        }
        if let Some(first_name) = changes.first_name.as_deref() {
            merged.first_name = v.required("first_name", first_name);
            patch.set("first_name", merged.first_name.clone())?;
        }
        if let Some(last_name) = changes.last_name.as_deref() {
            merged.last_name = v.required("last_name", last_name);
            patch.set("last_name", merged.last_name.clone())?;
        }
        if let Some(phone) = changes.phone {
            merged.phone = v.optional(phone.as_deref());
            patch.set("phone", merged.phone.clone())?;
        }
        if let Some(address) = changes.address {
            merged.address = v.optional(address.as_deref());
            patch.set("address", merged.address.clone())?;
        }
        if let Some(birth_date) = changes.birth_date {
            merged.birth_date = birth_date;
            patch.set("birth_date", birth_date.map(|d| d.to_string()))?;
        }
        if let Some(hire_date) = changes.hire_date {
            merged.hire_date = hire_date;
            patch.set("hire_date", hire_date.map(|d| d.to_string()))?;
        }
        if let Some(termination_date) = changes.termination_date {
            merged.termination_date = termination_date;
            patch.set("termination_date", termination_date.map(|d| d.to_string()))?;
        }
        if let Some(country_id) = changes.country_id {
            merged.country_id = country_id;
            patch.set("country_id", country_id)?;
        }
        if let Some(state_id) = changes.state_id {
            merged.state_id = state_id;
            patch.set("state_id", state_id)?;
        }
        if let Some(status) = changes.status.as_deref() {
            if let Some(status) = v.choice::<IndividualStatus>("status", status) {
                check_transition(&mut v, existing.status, status);
                merged.status = status;
                patch.set("status", status.as_str())?;
            }
        }
        if let Some(is_active) = changes.is_active {
            patch.set("is_active", is_active)?;
        }

        check_dates(&mut v, &merged);
        let touched = Touched {
            owner: merged.user_id != existing.user_id,
            location: merged.country_id != existing.country_id || merged.state_id != existing.state_id,
        };
        if touched.owner || touched.location {
            self.check_references(&mut v, &merged, touched).await?;
        }
        v.finish()?;

        if merged.document_number != existing.document_number {
            self.ensure_document_free(&merged.document_number).await?;
        }
        if let Some(user_id) = merged.user_id.filter(|_| merged.user_id != existing.user_id) {
            if self.individuals.get_by_user(&self.pool, user_id).await?.is_some() {
                return Err(ServiceError::already_exists(Individual::NAME, "user_id", user_id));
            }
        }

        let updated = self.individuals.update(&self.pool, &existing, &patch).await?;
        info!(individual_id = updated.id, fields = patch.len(), "Updated individual");
        Ok(updated)
    }

    /// Moves the profile to `status`. Terminated profiles stay terminated.
    pub async fn change_status(&self, id: i64, status: &str) -> Result<Individual, ServiceError> {
        let existing = self.get(id).await?;
        let mut v = Validator::new(Individual::NAME);
        let next = v.choice::<IndividualStatus>("status", status);
        if let Some(next) = next {
            check_transition(&mut v, existing.status, next);
        }
        v.finish()?;

        let next = next.unwrap_or(existing.status);
        if next == existing.status {
            return Ok(existing);
        }

        let mut patch = Patch::new();
        patch.set("status", next.as_str())?;
        let updated = self.individuals.update(&self.pool, &existing, &patch).await?;
        info!(individual_id = id, from = %existing.status, to = %next, "Changed individual status");
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        if self.individuals.delete_by_id(&self.pool, id).await? {
            info!(individual_id = id, "Deleted individual");
            Ok(())
        } else {
            Err(ServiceError::not_found(Individual::NAME, id))
        }
    }

    async fn ensure_document_free(&self, document_number: &str) -> Result<(), ServiceError> {
        if self
            .individuals
            .get_by_document_number(&self.pool, document_number)
            .await?
            .is_some()
        {
            return Err(ServiceError::already_exists(
                Individual::NAME,
                "document_number",
                document_number,
            ));
        }
        Ok(())
    }

    /// Owner, country and state must be visible, and the state must belong
    /// to the country.
    async fn check_references(
        &self,
        v: &mut Validator,
        record: &Individual,
        touched: Touched,
    ) -> Result<(), ServiceError> {
        if let Some(user_id) = record.user_id.filter(|_| touched.owner) {
            match self.users.get_by_id(&self.pool, user_id).await? {
                Some(_) => {}
                None => v.error("user_id", format!("{} {} does not exist", User::NAME, user_id)),
            }
        }

        if !touched.location {
            return Ok(());
        }

        if let Some(country_id) = record.country_id {
            if self.countries.get_by_id(&self.pool, country_id).await?.is_none() {
                v.error("country_id", format!("{} {} does not exist", Country::NAME, country_id));
            }
        }

        if let Some(state_id) = record.state_id {
            match (self.states.get_by_id(&self.pool, state_id).await?, record.country_id) {
                (None, _) => v.error("state_id", format!("{} {} does not exist", State::NAME, state_id)),
                (Some(_), None) => v.error("state_id", "requires country_id"),
                (Some(state), Some(country_id)) if state.country_id != country_id => v.error(
                    "state_id",
                    format!("{} {} does not belong to country {}", State::NAME, state_id, country_id),
                ),
                (Some(_), Some(_)) => {}
            }
        }
        Ok(())
    }
}

/// Validates the synchronous rules and builds the unsaved record. The
/// returned validator is left open for reference checks.
fn prepare(input: &CreateIndividual) -> (Validator, Individual) {
    let mut v = Validator::new(Individual::NAME);
    let document_type = v.choice::<DocumentType>("document_type", &input.document_type);
    let document_number = v.required("document_number", &input.document_number);
    let first_name = v.required("first_name", &input.first_name);
    let last_name = v.required("last_name", &input.last_name);
    let status = match input.status.as_deref() {
        Some(status) => v.choice::<IndividualStatus>("status", status),
        None => Some(IndividualStatus::default()),
    };

    let mut record = Individual::new(
        document_type.unwrap_or(DocumentType::NationalId),
        document_number,
        first_name,
        last_name,
    );
    record.user_id = input.user_id;
    record.phone = v.optional(input.phone.as_deref());
    record.address = v.optional(input.address.as_deref());
    record.birth_date = input.birth_date;
    record.hire_date = input.hire_date;
    record.termination_date = input.termination_date;
    record.country_id = input.country_id;
    record.state_id = input.state_id;
    record.status = status.unwrap_or_default();
    record.audit.is_active = input.is_active.unwrap_or(true);

    check_dates(&mut v, &record);
    (v, record)
}

fn check_dates(v: &mut Validator, record: &Individual) {
    if let Some(birth_date) = record.birth_date {
        v.check(birth_date <= Utc::now().date_naive(), "birth_date", "must not be in the future");
    }
    if let (Some(hire), Some(termination)) = (record.hire_date, record.termination_date) {
        v.check(hire <= termination, "termination_date", "must not be before hire_date");
    }
}

fn check_transition(v: &mut Validator, from: IndividualStatus, to: IndividualStatus) {
    if !from.can_transition_to(to) {
        v.error("status", format!("cannot change from {} to {}", from, to));
    }
}
