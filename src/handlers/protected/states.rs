use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::PermissionLevel;
use crate::database::models::{CreateState, Individual, State as Region, UpdateState};
use crate::handlers::params::{parse_id, EntityId, JsonBody, ListParams};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, PageBody};

#[derive(Debug, Default, Deserialize)]
pub struct StateFilter {
    pub country_id: Option<String>,
}

/// GET /api/states
pub async fn list(
    State(state): State<AppState>,
    caller: CurrentUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<StateFilter>,
) -> ApiResult<PageBody<Region>> {
    caller.require_permission("states", "list", PermissionLevel::Read)?;
    let mut query = params.validate::<Region>(&state.config.pagination)?;
    if let Some(raw) = filter.country_id.as_deref() {
        query.options = query.options.filter_by("country_id", parse_id("country_id", raw)?);
    }
    let page = state.services.states.list(&query.options).await?;
    Ok(ApiResponse::success(PageBody::new(page, query.page, query.per_page)))
}

/// POST /api/states
pub async fn create(
    State(state): State<AppState>,
    caller: CurrentUser,
    JsonBody(input): JsonBody<CreateState>,
) -> ApiResult<Region> {
    caller.require_permission("states", "create", PermissionLevel::Create)?;
    Ok(ApiResponse::created(state.services.states.create(input).await?))
}

/// GET /api/states/:id
pub async fn get(
    State(state): State<AppState>,
    caller: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<Region> {
    caller.require_permission("states", "get", PermissionLevel::Read)?;
    Ok(ApiResponse::success(state.services.states.get(id).await?))
}

/// PATCH /api/states/:id
pub async fn update(
    State(state): State<AppState>,
    caller: CurrentUser,
    EntityId(id): EntityId,
    JsonBody(changes): JsonBody<UpdateState>,
) -> ApiResult<Region> {
    caller.require_permission("states", "update", PermissionLevel::Update)?;
    Ok(ApiResponse::success(state.services.states.update(id, changes).await?))
}

/// DELETE /api/states/:id
pub async fn delete(
    State(state): State<AppState>,
    caller: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<Value> {
    caller.require_permission("states", "delete", PermissionLevel::Delete)?;
    state.services.states.delete(id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

/// GET /api/states/:id/individuals
pub async fn individuals(
    State(state): State<AppState>,
    caller: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<Vec<Individual>> {
    caller.require_permission("individuals", "list", PermissionLevel::Read)?;
    Ok(ApiResponse::success(state.services.individuals.list_by_state(id).await?))
}
