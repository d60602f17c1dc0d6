use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use sqlx::SqlitePool;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, optional_auth_middleware};
use crate::services::Services;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pool: SqlitePool,
    pub services: Services,
}

impl AppState {
    pub fn new(config: AppConfig, pool: SqlitePool) -> Self {
        Self {
            config: Arc::new(config),
            services: Services::new(pool.clone()),
            pool,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .merge(user_routes())
        .merge(country_routes())
        .merge(state_routes())
        .merge(individual_routes())
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    let public_routes = Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route_layer(from_fn_with_state(state.clone(), optional_auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.security.cors_origins)),
        )
        .with_state(state)
}

fn user_routes() -> Router<AppState> {
    use protected::users;

    Router::new()
        .route("/api/users", get(users::list).post(users::create))
        .route(
            "/api/users/:id",
            get(users::get).patch(users::update).delete(users::delete),
        )
}

fn country_routes() -> Router<AppState> {
    use protected::countries;

    Router::new()
        .route("/api/countries", get(countries::list).post(countries::create))
        .route("/api/countries/active", get(countries::active))
        .route("/api/countries/code/:code", get(countries::get_by_code))
        .route(
            "/api/countries/:id",
            get(countries::get).patch(countries::update).delete(countries::delete),
        )
        .route("/api/countries/:id/states", get(countries::states))
}

fn state_routes() -> Router<AppState> {
    use protected::states;

    Router::new()
        .route("/api/states", get(states::list).post(states::create))
        .route(
            "/api/states/:id",
            get(states::get).patch(states::update).delete(states::delete),
        )
        .route("/api/states/:id/individuals", get(states::individuals))
}

fn individual_routes() -> Router<AppState> {
    use protected::individuals;

    Router::new()
        .route("/api/individuals", get(individuals::list).post(individuals::create))
        .route("/api/individuals/with-user", post(individuals::create_with_user))
        .route("/api/individuals/by-user/:user_id", get(individuals::get_by_user))
        .route("/api/individuals/by-status/:status", get(individuals::by_status))
        .route(
            "/api/individuals/:id",
            get(individuals::get).patch(individuals::update).delete(individuals::delete),
        )
        .route("/api/individuals/:id/status", put(individuals::change_status))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::permissive().allow_origin(AllowOrigin::list(origins))
}
