use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::config::PaginationConfig;
use crate::database::{Entity, ListOptions};
use crate::error::ApiError;
use crate::filter::SortDirection;
use crate::services::FieldErrors;

/// Query string of every list endpoint. Values arrive as text so that bad
/// input is reported per field.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub active_only: Option<String>,
    pub search: Option<String>,
    pub order_by: Option<String>,
    pub order_direction: Option<String>,
}

/// Validated list request.
#[derive(Debug)]
pub struct ListQuery {
    pub options: ListOptions,
    pub page: i64,
    pub per_page: i64,
}

impl ListParams {
    pub fn validate<T: Entity>(&self, pagination: &PaginationConfig) -> Result<ListQuery, ApiError> {
        let mut errors = FieldErrors::new();

        let page = match self.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some(raw) => match raw.parse::<i64>() {
                Ok(page) if page >= 1 => page,
                _ => {
                    errors.insert("page".to_string(), "must be an integer >= 1".to_string());
                    1
                }
            },
        };

        let per_page = match self.per_page.as_deref().map(str::trim) {
            None | Some("") => pagination.default_per_page,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if (1..=pagination.max_per_page).contains(&n) => n,
                _ => {
                    errors.insert(
                        "per_page".to_string(),
                        format!("must be between 1 and {}", pagination.max_per_page),
                    );
                    pagination.default_per_page
                }
            },
        };

        let active_only = match self.active_only.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(raw) => parse_bool(raw).unwrap_or_else(|| {
                errors.insert("active_only".to_string(), "must be true or false".to_string());
                true
            }),
        };

        let order_by = match self.order_by.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(column) if T::known_columns().iter().any(|c| *c == column) => Some(column.to_string()),
            Some(column) => {
                errors.insert(
                    "order_by".to_string(),
                    format!("'{}' is not a column of {}", column, T::NAME),
                );
                None
            }
        };

        let direction = match self.order_direction.as_deref().map(str::trim) {
            None | Some("") => SortDirection::Asc,
            Some(raw) => SortDirection::parse(raw).unwrap_or_else(|| {
                errors.insert("order_direction".to_string(), "must be asc or desc".to_string());
                SortDirection::Asc
            }),
        };

        // The store takes offsets as u32.
        let skip = (page - 1)
            .checked_mul(per_page)
            .filter(|skip| *skip <= i64::from(u32::MAX));
        if skip.is_none() && !errors.contains_key("page") {
            errors.insert("page".to_string(), "is too large for the page size".to_string());
        }

        if !errors.is_empty() {
            return Err(ApiError::unprocessable_entity("Invalid list parameters", errors));
        }

        let search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(ListQuery {
            options: ListOptions {
                skip: skip.unwrap_or_default(),
                limit: per_page,
                active_only,
                search,
                order_by,
                direction,
                filters: vec![],
            },
            page,
            per_page,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Parses a positive integer identifier.
pub fn parse_id(field: &str, raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::invalid_field(field, "must be a positive integer"))
}

/// The single `:id` segment of a route, required to be positive.
#[derive(Debug, Clone, Copy)]
pub struct EntityId(pub i64);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for EntityId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        parse_id("id", &raw).map(EntityId)
    }
}

/// `Json` whose rejections use the API error body.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}
