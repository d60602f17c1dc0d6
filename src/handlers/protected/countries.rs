use axum::extract::{Path, Query, State};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::PermissionLevel;
use crate::database::models::{Country, CreateCountry, State as Region, UpdateCountry};
use crate::handlers::params::{EntityId, JsonBody, ListParams};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, PageBody};

/// GET /api/countries
pub async fn list(
    State(state): State<AppState>,
    caller: CurrentUser,
    Query(params): Query<ListParams>,
) -> ApiResult<PageBody<Country>> {
    caller.require_permission("countries", "list", PermissionLevel::Read)?;
    let query = params.validate::<Country>(&state.config.pagination)?;
    let page = state.services.countries.list(&query.options).await?;
    Ok(ApiResponse::success(PageBody::new(page, query.page, query.per_page)))
}

/// POST /api/countries
pub async fn create(
    State(state): State<AppState>,
    caller: CurrentUser,
    JsonBody(input): JsonBody<CreateCountry>,
) -> ApiResult<Country> {
    caller.require_permission("countries", "create", PermissionLevel::Create)?;
    Ok(ApiResponse::created(state.services.countries.create(input).await?))
}

/// GET /api/countries/:id
pub async fn get(
    State(state): State<AppState>,
    caller: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<Country> {
    caller.require_permission("countries", "get", PermissionLevel::Read)?;
    Ok(ApiResponse::success(state.services.countries.get(id).await?))
}

/// GET /api/countries/code/:code
pub async fn get_by_code(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(code): Path<String>,
) -> ApiResult<Country> {
    caller.require_permission("countries", "get", PermissionLevel::Read)?;
    Ok(ApiResponse::success(state.services.countries.get_by_code(&code).await?))
}

/// GET /api/countries/active - enabled countries by name, unpaged
pub async fn active(State(state): State<AppState>, caller: CurrentUser) -> ApiResult<Vec<Country>> {
    caller.require_permission("countries", "list", PermissionLevel::Read)?;
    Ok(ApiResponse::success(state.services.countries.list_active().await?))
}

/// GET /api/countries/:id/states
pub async fn states(
    State(state): State<AppState>,
    caller: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<Vec<Region>> {
    caller.require_permission("states", "list", PermissionLevel::Read)?;
    Ok(ApiResponse::success(state.services.states.list_by_country(id).await?))
}

/// PATCH /api/countries/:id
pub async fn update(
    State(state): State<AppState>,
    caller: CurrentUser,
    EntityId(id): EntityId,
    JsonBody(changes): JsonBody<UpdateCountry>,
) -> ApiResult<Country> {
    caller.require_permission("countries", "update", PermissionLevel::Update)?;
    Ok(ApiResponse::success(state.services.countries.update(id, changes).await?))
}

/// DELETE /api/countries/:id
pub async fn delete(
    State(state): State<AppState>,
    caller: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<Value> {
    caller.require_permission("countries", "delete", PermissionLevel::Delete)?;
    state.services.countries.delete(id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
