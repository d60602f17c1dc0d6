use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::PermissionLevel;
use crate::database::models::{
    CreateIndividual, CreateIndividualWithUser, Individual, IndividualStatus, UnknownValue,
    UpdateIndividual, User,
};
use crate::error::ApiError;
use crate::handlers::params::{parse_id, EntityId, JsonBody, ListParams};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, PageBody};

#[derive(Debug, Default, Deserialize)]
pub struct IndividualFilter {
    pub status: Option<String>,
    pub state_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct IndividualWithUser {
    pub user: User,
    pub individual: Individual,
}

/// GET /api/individuals
pub async fn list(
    State(state): State<AppState>,
    caller: CurrentUser,
    Query(params): Query<ListParams>,
    Query(filter): Query<IndividualFilter>,
) -> ApiResult<PageBody<Individual>> {
    caller.require_permission("individuals", "list", PermissionLevel::Read)?;
    let mut query = params.validate::<Individual>(&state.config.pagination)?;
    if let Some(raw) = filter.status.as_deref() {
        let status: IndividualStatus = raw
            .parse()
            .map_err(|e: UnknownValue| ApiError::invalid_field("status", e.to_string()))?;
        query.options = query.options.filter_by("status", status.as_str());
    }
    if let Some(raw) = filter.state_id.as_deref() {
        query.options = query.options.filter_by("state_id", parse_id("state_id", raw)?);
    }
    let page = state.services.individuals.list(&query.options).await?;
    Ok(ApiResponse::success(PageBody::new(page, query.page, query.per_page)))
}

/// POST /api/individuals
pub async fn create(
    State(state): State<AppState>,
    caller: CurrentUser,
    JsonBody(input): JsonBody<CreateIndividual>,
) -> ApiResult<Individual> {
    caller.require_permission("individuals", "create", PermissionLevel::Create)?;
    Ok(ApiResponse::created(state.services.individuals.create(input).await?))
}

/// POST /api/individuals/with-user - creates the user and the profile atomically
pub async fn create_with_user(
    State(state): State<AppState>,
    caller: CurrentUser,
    JsonBody(input): JsonBody<CreateIndividualWithUser>,
) -> ApiResult<IndividualWithUser> {
    caller.require_permission("individuals", "create_with_user", PermissionLevel::Create)?;
    let (user, individual) = state
        .services
        .individuals
        .create_with_user(caller.role(), input)
        .await?;
    Ok(ApiResponse::created(IndividualWithUser { user, individual }))
}

/// GET /api/individuals/:id
pub async fn get(
    State(state): State<AppState>,
    caller: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<Individual> {
    caller.require_permission("individuals", "get", PermissionLevel::Read)?;
    Ok(ApiResponse::success(state.services.individuals.get(id).await?))
}

/// GET /api/individuals/by-user/:user_id
pub async fn get_by_user(
    State(state): State<AppState>,
    caller: CurrentUser,
    EntityId(user_id): EntityId,
) -> ApiResult<Individual> {
    caller.require_permission("individuals", "get", PermissionLevel::Read)?;
    Ok(ApiResponse::success(state.services.individuals.get_by_user(user_id).await?))
}

/// GET /api/individuals/by-status/:status
pub async fn by_status(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(status): Path<String>,
) -> ApiResult<Vec<Individual>> {
    caller.require_permission("individuals", "list", PermissionLevel::Read)?;
    Ok(ApiResponse::success(state.services.individuals.list_by_status(&status).await?))
}

/// PATCH /api/individuals/:id
pub async fn update(
    State(state): State<AppState>,
    caller: CurrentUser,
    EntityId(id): EntityId,
    JsonBody(changes): JsonBody<UpdateIndividual>,
) -> ApiResult<Individual> {
    caller.require_permission("individuals", "update", PermissionLevel::Update)?;
    Ok(ApiResponse::success(state.services.individuals.update(id, changes).await?))
}

/// PUT /api/individuals/:id/status
pub async fn change_status(
    State(state): State<AppState>,
    caller: CurrentUser,
    EntityId(id): EntityId,
    JsonBody(change): JsonBody<StatusChange>,
) -> ApiResult<Individual> {
    caller.require_permission("individuals", "change_status", PermissionLevel::Update)?;
    let individual = state.services.individuals.change_status(id, &change.status).await?;
    Ok(ApiResponse::success(individual))
}

/// DELETE /api/individuals/:id
pub async fn delete(
    State(state): State<AppState>,
    caller: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<Value> {
    caller.require_permission("individuals", "delete", PermissionLevel::Delete)?;
    state.services.individuals.delete(id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
