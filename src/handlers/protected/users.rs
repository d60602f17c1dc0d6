use axum::extract::{Query, State};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::PermissionLevel;
use crate::database::models::{CreateUser, Role, UpdateUser, User};
use crate::handlers::params::{EntityId, JsonBody, ListParams};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, PageBody};

/// GET /api/users
pub async fn list(
    State(state): State<AppState>,
    caller: CurrentUser,
    Query(params): Query<ListParams>,
) -> ApiResult<PageBody<User>> {
    caller.require_permission("users", "list", PermissionLevel::Read)?;
    let query = params.validate::<User>(&state.config.pagination)?;
    let page = state.services.users.list(&query.options).await?;
    Ok(ApiResponse::success(PageBody::new(page, query.page, query.per_page)))
}

/// POST /api/users
pub async fn create(
    State(state): State<AppState>,
    caller: CurrentUser,
    JsonBody(input): JsonBody<CreateUser>,
) -> ApiResult<User> {
    caller.require_permission("users", "create", PermissionLevel::Create)?;
    caller.require_role(Role::Manager)?;
    let user = state.services.users.create(caller.role(), input).await?;
    Ok(ApiResponse::created(user))
}

/// GET /api/users/:id
pub async fn get(
    State(state): State<AppState>,
    caller: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<User> {
    caller.require_permission("users", "get", PermissionLevel::Read)?;
    Ok(ApiResponse::success(state.services.users.get(id).await?))
}

/// PATCH /api/users/:id
pub async fn update(
    State(state): State<AppState>,
    caller: CurrentUser,
    EntityId(id): EntityId,
    JsonBody(changes): JsonBody<UpdateUser>,
) -> ApiResult<User> {
    caller.require_permission("users", "update", PermissionLevel::Update)?;
    caller.require_role(Role::Manager)?;
    let user = state.services.users.update(caller.role(), id, changes).await?;
    Ok(ApiResponse::success(user))
}

/// DELETE /api/users/:id
pub async fn delete(
    State(state): State<AppState>,
    caller: CurrentUser,
    EntityId(id): EntityId,
) -> ApiResult<Value> {
    caller.require_permission("users", "delete", PermissionLevel::Delete)?;
    caller.require_role(Role::Manager)?;
    state.services.users.delete(caller.role(), id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
