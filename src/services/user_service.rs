use sqlx::SqlitePool;
use tracing::info;

use crate::database::models::{CreateUser, Role, UpdateUser, User};
use crate::database::repositories::{IndividualRepository, UserRepository};
use crate::database::{Entity, ListOptions, Page, Patch};
use crate::services::error::ServiceError;
use crate::services::validation::{is_email, Validator};

#[derive(Debug, Clone)]
pub struct UserService {
    pool: SqlitePool,
    users: UserRepository,
    individuals: IndividualRepository,
}

impl UserService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            users: UserRepository::new(),
            individuals: IndividualRepository::new(),
        }
    }

    /// Validates and normalizes `input` into a new, unsaved record.
    pub(crate) fn prepare(input: &CreateUser) -> Result<User, ServiceError> {
        let mut v = Validator::new(User::NAME);
        let email = v.required("email", &input.email).to_lowercase();
        if !email.is_empty() {
            v.check(is_email(&email), "email", "must be a valid email address");
        }
        let full_name = v.required("full_name", &input.full_name);
        let role = match input.role.as_deref() {
            Some(role) => v.choice::<Role>("role", role),
            None => Some(Role::default()),
        };
        v.finish()?;

        let mut user = User::new(email, full_name, role.unwrap_or_default());
        user.audit.is_active = input.is_active.unwrap_or(true);
        Ok(user)
    }

    pub async fn create(&self, actor: Role, input: CreateUser) -> Result<User, ServiceError> {
        let user = Self::prepare(&input)?;
        guard_role(actor, user.role)?;

        if self.users.get_by_email(&self.pool, &user.email).await?.is_some() {
            return Err(ServiceError::already_exists(User::NAME, "email", &user.email));
        }

        let created = self.users.create(&self.pool, &user).await?;
        info!(user_id = created.id, role = %created.role, "Created user");
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> Result<User, ServiceError> {
        self.users
            .get_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(User::NAME, id))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<User, ServiceError> {
        self.users
            .get_by_email(&self.pool, email)
            .await?
            .ok_or_else(|| ServiceError::not_found(User::NAME, email))
    }

    pub async fn list(&self, options: &ListOptions) -> Result<Page<User>, ServiceError> {
        Ok(self.users.list(&self.pool, options).await?)
    }

    pub async fn update(&self, actor: Role, id: i64, changes: UpdateUser) -> Result<User, ServiceError> {
        let existing = self.get(id).await?;
        guard_role(actor, existing.role)?;

        let mut v = Validator::new(User::NAME);
        let mut patch = Patch::new();

        if let Some(email) = changes.email.as_deref() {
            let email = v.required("email", email).to_lowercase();
            if !email.is_empty() && !is_email(&email) {
                v.error("email", "must be a valid email address");
            }
            if !v.has_errors() && email != existing.email {
                if self.users.get_by_email(&self.pool, &email).await?.is_some() {
                    return Err(ServiceError::already_exists(User::NAME, "email", email));
                }
                patch.set("email", email)?;
            }
        }
        if let Some(full_name) = changes.full_name.as_deref() {
            let full_name = v.required("full_name", full_name);
            patch.set("full_name", full_name)?;
        }
        if let Some(role) = changes.role.as_deref() {
            if let Some(role) = v.choice::<Role>("role", role) {
                guard_role(actor, role)?;
                patch.set("role", role.as_str())?;
            }
        }
        if let Some(is_active) = changes.is_active {
            patch.set("is_active", is_active)?;
        }
        v.finish()?;

        let updated = self.users.update(&self.pool, &existing, &patch).await?;
        info!(user_id = updated.id, fields = patch.len(), "Updated user");
        Ok(updated)
    }

    /// Soft-deletes a user that owns no visible profile. Deleting an already
    /// deleted user succeeds.
    pub async fn delete(&self, actor: Role, id: i64) -> Result<(), ServiceError> {
        if let Some(mut existing) = self.users.get_by_id(&self.pool, id).await? {
            guard_role(actor, existing.role)?;
            if self.individuals.count_referencing(&self.pool, "user_id", id).await? > 0 {
                return Err(ServiceError::invalid(
                    User::NAME,
                    "individual",
                    "user still owns an individual profile; delete it first",
                ));
            }
            self.users.delete(&self.pool, &mut existing).await?;
            info!(user_id = id, "Deleted user");
            return Ok(());
        }
        if self.users.delete_by_id(&self.pool, id).await? {
            Ok(())
        } else {
            Err(ServiceError::not_found(User::NAME, id))
        }
    }

    /// Makes sure an administrator with `email` exists, creating it if needed.
    pub async fn ensure_admin(&self, email: &str, full_name: &str) -> Result<User, ServiceError> {
        let input = CreateUser {
            email: email.to_string(),
            full_name: full_name.to_string(),
            role: Some(Role::Admin.as_str().to_string()),
            is_active: Some(true),
        };
        let user = Self::prepare(&input)?;
        if let Some(existing) = self.users.get_by_email(&self.pool, &user.email).await? {
            return Ok(existing);
        }
        let created = self.users.create(&self.pool, &user).await?;
        info!(user_id = created.id, "Created bootstrap administrator");
        Ok(created)
    }
}

/// A caller may only act on, or grant, roles no more privileged than their own.
pub(crate) fn guard_role(actor: Role, target: Role) -> Result<(), ServiceError> {
    if actor.covers(target) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "a {} cannot manage {} users",
            actor, target
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{DocumentType, Individual};
    use crate::testing::TestContext;

    fn input(email: &str, role: Option<&str>) -> CreateUser {
        CreateUser {
            email: email.to_string(),
            full_name: "Test User".to_string(),
            role: role.map(str::to_string),
            is_active: None,
        }
    }

    #[tokio::test]
    async fn normalizes_and_rejects_duplicate_emails() -> anyhow::Result<()> {
        let ctx = TestContext::new().await?;
        let service = UserService::new(ctx.pool.clone());

        let created = service.create(Role::Admin, input(" Ana@Example.COM ", None)).await?;
        assert_eq!(created.email, "ana@example.com");
        assert_eq!(created.role, Role::Reader);

        let err = service.create(Role::Admin, input("ana@example.com", None)).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyExists { field, .. } if field == "email"));
        Ok(())
    }

    #[tokio::test]
    async fn reports_all_invalid_fields() -> anyhow::Result<()> {
        let ctx = TestContext::new().await?;
        let service = UserService::new(ctx.pool.clone());

        let mut bad = input("not-an-email", Some("owner"));
        bad.full_name = " ".to_string();
        match service.create(Role::Admin, bad).await {
            Err(ServiceError::Validation { entity, errors }) => {
                assert_eq!(entity, "User");
                assert_eq!(
                    errors.keys().map(String::as_str).collect::<Vec<_>>(),
                    vec!["email", "full_name", "role"]
                );
                assert!(errors["role"].contains("admin, manager, collaborator, reader, guest"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn managers_cannot_escalate() -> anyhow::Result<()> {
        let ctx = TestContext::new().await?;
        let service = UserService::new(ctx.pool.clone());

        let err = service.create(Role::Manager, input("boss@example.com", Some("admin"))).await;
        assert!(matches!(err, Err(ServiceError::Forbidden(_))));

        let reader = service.create(Role::Manager, input("r@example.com", Some("reader"))).await?;
        let promote = UpdateUser { role: Some("admin".to_string()), ..Default::default() };
        assert!(matches!(
            service.update(Role::Manager, reader.id, promote).await,
            Err(ServiceError::Forbidden(_))
        ));

        let admin = service.create(Role::Admin, input("root@example.com", Some("admin"))).await?;
        assert!(matches!(service.delete(Role::Manager, admin.id).await, Err(ServiceError::Forbidden(_))));
        Ok(())
    }

    #[tokio::test]
    async fn delete_twice_succeeds() -> anyhow::Result<()> {
        let ctx = TestContext::new().await?;
        let service = UserService::new(ctx.pool.clone());
        let user = service.create(Role::Admin, input("gone@example.com", None)).await?;

        service.delete(Role::Admin, user.id).await?;
        service.delete(Role::Admin, user.id).await?;
        assert!(matches!(service.get(user.id).await, Err(ServiceError::NotFound { .. })));
        assert!(matches!(service.delete(Role::Admin, 9_999).await, Err(ServiceError::NotFound { .. })));

        // The address is free again once the old row is soft-deleted.
        service.create(Role::Admin, input("gone@example.com", None)).await?;
        Ok(())
    }

    #[tokio::test]
    async fn owners_of_a_profile_cannot_be_deleted() -> anyhow::Result<()> {
        let ctx = TestContext::new().await?;
        let service = UserService::new(ctx.pool.clone());
        let owner = service.create(Role::Admin, input("owner@example.com", None)).await?;

        let mut profile = Individual::new(DocumentType::Passport, "P-1", "Ana", "Ruiz");
        profile.user_id = Some(owner.id);
        let mut profile = service.individuals.create(&ctx.pool, &profile).await?;

        match service.delete(Role::Admin, owner.id).await {
            Err(ServiceError::Validation { errors, .. }) => assert!(errors.contains_key("individual")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(service.get(owner.id).await?.id, owner.id);

        service.individuals.delete(&ctx.pool, &mut profile).await?;
        service.delete(Role::Admin, owner.id).await?;
        Ok(())
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() -> anyhow::Result<()> {
        let ctx = TestContext::new().await?;
        let service = UserService::new(ctx.pool.clone());
        let first = service.ensure_admin("admin@example.com", "Admin").await?;
        let second = service.ensure_admin("ADMIN@example.com", "Admin").await?;
        assert_eq!(first.id, second.id);
        assert_eq!(second.role, Role::Admin);
        Ok(())
    }
}
