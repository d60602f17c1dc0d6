use std::str::FromStr;

use crate::database::models::UnknownValue;
use crate::services::error::{FieldErrors, ServiceError};

/// Collects field errors so that every failing field is reported at once.
/// The first error recorded for a field wins.
#[derive(Debug)]
pub struct Validator {
    entity: &'static str,
    errors: FieldErrors,
}

impl Validator {
    pub fn new(entity: &'static str) -> Self {
        Self { entity, errors: FieldErrors::new() }
    }

    pub fn error(&mut self, field: &str, reason: impl Into<String>) {
        self.errors.entry(field.to_string()).or_insert_with(|| reason.into());
    }

    pub fn check(&mut self, ok: bool, field: &str, reason: &str) {
        if !ok {
            self.error(field, reason);
        }
    }

    /// Trims `value`; an empty result is an error.
    pub fn required(&mut self, field: &str, value: &str) -> String {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.error(field, "must not be empty");
        }
        trimmed.to_string()
    }

    /// Trims an optional value; blank becomes `None`.
    pub fn optional(&mut self, value: Option<&str>) -> Option<String> {
        value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
    }

    /// Parses a closed-set value, recording the accepted values on failure.
    pub fn choice<T>(&mut self, field: &str, value: &str) -> Option<T>
    where
        T: FromStr<Err = UnknownValue>,
    {
        match value.parse::<T>() {
            Ok(v) => Some(v),
            Err(e) => {
                self.error(field, format!("'{}' is not allowed; accepted values: {}", e.value, e.accepted));
                None
            }
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), ServiceError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation { entity: self.entity, errors: self.errors })
        }
    }
}

pub fn is_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
