use std::collections::BTreeMap;

use crate::database::{PatchError, RepositoryError};

/// Field name → reason, in field order.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("{entity} with {field} '{value}' already exists")]
    AlreadyExists {
        entity: &'static str,
        field: String,
        value: String,
    },

    #[error("Invalid {entity}")]
    Validation { entity: &'static str, errors: FieldErrors },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Persistence(RepositoryError),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        ServiceError::NotFound { entity, key: key.to_string() }
    }

    pub fn already_exists(entity: &'static str, field: &str, value: impl ToString) -> Self {
        ServiceError::AlreadyExists {
            entity,
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn invalid(entity: &'static str, field: &str, reason: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), reason.into());
        ServiceError::Validation { entity, errors }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => ServiceError::not_found(entity, id),
            // The store's unique constraint backs up the service pre-checks.
            RepositoryError::UniqueViolation { table, columns } => ServiceError::AlreadyExists {
                entity: entity_name(&table),
                field: columns.join(", "),
                value: String::new(),
            },
            RepositoryError::Patch(PatchError::UnknownField { entity, field }) => {
                ServiceError::invalid(entity, &field, "unknown field")
            }
            RepositoryError::Patch(PatchError::SystemFieldNotAllowed(field)) => {
                ServiceError::invalid("Record", &field, "field is managed by the system")
            }
            RepositoryError::Patch(PatchError::InvalidValue { entity, message }) => {
                ServiceError::invalid(entity, "body", message)
            }
            RepositoryError::InvalidPagination(reason) => {
                ServiceError::invalid("Record", "pagination", reason)
            }
            other => ServiceError::Persistence(other),
        }
    }
}

impl From<PatchError> for ServiceError {
    fn from(err: PatchError) -> Self {
        RepositoryError::Patch(err).into()
    }
}

fn entity_name(table: &str) -> &'static str {
    match table {
        "users" => "User",
        "countries" => "Country",
        "states" => "State",
        "individuals" => "Individual",
        _ => "Record",
    }
}
