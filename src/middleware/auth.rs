use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};

use crate::app::AppState;
use crate::auth::{decode_jwt, level_for, PermissionLevel};
use crate::database::models::{Role, User};
use crate::error::ApiError;

/// The authenticated caller, loaded from the users table.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn role(&self) -> Role {
        self.0.role
    }

    /// Allows the request when the caller's role holds at least `minimum`
    /// on `entity:action`.
    pub fn require_permission(
        &self,
        entity: &str,
        action: &str,
        minimum: PermissionLevel,
    ) -> Result<(), ApiError> {
        let role = self.0.role;
        match level_for(role, entity, action) {
            Some(level) if level >= minimum => Ok(()),
            Some(level) => {
                warn!(user_id = self.0.id, %role, entity, action, ?level, ?minimum, "Permission denied");
                Err(ApiError::forbidden(format!(
                    "Role '{}' does not grant {}:{} ({:?} required)",
                    role, entity, action, minimum
                )))
            }
            None => {
                error!(entity, action, "Permission is not configured");
                Err(ApiError::internal_server_error(format!(
                    "Permission not configured: {}:{}",
                    entity, action
                )))
            }
        }
    }

    /// Allows the request when the caller is at least as privileged as `minimum`.
    pub fn require_role(&self, minimum: Role) -> Result<(), ApiError> {
        if self.0.role.covers(minimum) {
            Ok(())
        } else {
            warn!(user_id = self.0.id, role = %self.0.role, required = %minimum, "Role check failed");
            Err(ApiError::forbidden(format!("Requires role '{}' or higher", minimum)))
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Resolves the bearer token in `headers` to an active user.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = extract_jwt_from_headers(headers).map_err(ApiError::unauthorized)?;
    let claims = decode_jwt(&token, &state.config.security)?;
    let user_id = claims.user_id()?;

    let user = match state.services.users.get(user_id).await {
        Ok(user) => user,
        Err(crate::services::ServiceError::NotFound { .. }) => {
            warn!(user_id, "Token refers to a missing user");
            return Err(ApiError::unauthorized("User no longer exists"));
        }
        Err(e) => return Err(e.into()),
    };
    if !user.audit.is_active {
        warn!(user_id, "Inactive user rejected");
        return Err(ApiError::forbidden("User is inactive"));
    }
    Ok(user)
}

/// JWT authentication middleware that validates tokens and loads the caller
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Loads the caller when a usable token is present. Public routes read it
/// through `Option<CurrentUser>`; bad credentials leave the request anonymous.
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.headers().contains_key(AUTHORIZATION) {
        let outcome = authenticate(&state, request.headers()).await;
        match outcome {
            Ok(user) => {
                request.extensions_mut().insert(CurrentUser(user));
            }
            Err(err) => debug!(error = %err, "Ignoring credentials on public route"),
        }
    }
    next.run(request).await
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_tokens() {
        assert_eq!(extract_jwt_from_headers(&headers("Bearer abc")).unwrap(), "abc");
        assert!(extract_jwt_from_headers(&headers("Basic abc")).is_err());
        assert!(extract_jwt_from_headers(&headers("Bearer  ")).is_err());
        assert!(extract_jwt_from_headers(&HeaderMap::new()).is_err());
    }

    #[test]
    fn permissions_are_checked_per_entity_action() {
        let reader = CurrentUser(User::new("r@example.com", "Reader", Role::Reader));
        assert!(reader.require_permission("countries", "list", PermissionLevel::Read).is_ok());
        assert!(reader.require_permission("countries", "create", PermissionLevel::Create).is_err());
        assert!(reader.require_role(Role::Manager).is_err());

        let collaborator = CurrentUser(User::new("c@example.com", "Collaborator", Role::Collaborator));
        assert!(collaborator.require_permission("individuals", "update", PermissionLevel::Update).is_ok());
        assert!(matches!(
            collaborator.require_permission("countries", "update", PermissionLevel::Update),
            Err(ApiError::Forbidden(_))
        ));

        let manager = CurrentUser(User::new("m@example.com", "Manager", Role::Manager));
        assert!(manager.require_permission("users", "create", PermissionLevel::Create).is_ok());
        assert!(manager.require_permission("users", "delete", PermissionLevel::Delete).is_err());
        assert!(manager.require_role(Role::Collaborator).is_ok());
    }

    #[test]
    fn unconfigured_permissions_fail_closed() {
        let admin = CurrentUser(User::new("a@example.com", "Admin", Role::Admin));
        assert!(matches!(
            admin.require_permission("individuals", "manage_skills", PermissionLevel::Read),
            Err(ApiError::InternalServerError(_))
        ));
    }
}
