#![allow(dead_code)]

use anyhow::{Context, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use sqlx::SqlitePool;

use layered_api::auth::generate_jwt;
use layered_api::config::{AppConfig, DatabaseConfig};
use layered_api::database::models::{CreateUser, Role};
use layered_api::database::DatabaseManager;
use layered_api::services::UserService;
use layered_api::{app, AppState};

/// An in-process server over a private in-memory database, with a
/// bootstrap administrator.
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub pool: SqlitePool,
    pub admin_token: String,
    config: AppConfig,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let mut config = AppConfig::development();
        config.database = DatabaseConfig::in_memory();
        config.security.jwt_secret = "integration-test-secret".to_string();

        let pool = DatabaseManager::connect(&config.database).await?;
        DatabaseManager::migrate(&pool).await?;

        let admin = UserService::new(pool.clone())
            .ensure_admin("admin@example.com", "Administrator")
            .await?;
        let admin_token = generate_jwt(admin.id, &config.security)?;

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        let router = app(AppState::new(config.clone(), pool.clone()));
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
            pool,
            admin_token,
            config,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Creates a user with `role` and returns a token for it.
    pub async fn token_for(&self, email: &str, role: Role) -> Result<String> {
        let input = CreateUser {
            email: email.to_string(),
            full_name: "Integration User".to_string(),
            role: Some(role.as_str().to_string()),
            is_active: None,
        };
        let user = UserService::new(self.pool.clone()).create(Role::Admin, input).await?;
        Ok(generate_jwt(user.id, &self.config.security)?)
    }

    pub fn token(&self, user_id: i64) -> Result<String> {
        Ok(generate_jwt(user_id, &self.config.security)?)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(&self.admin_token)
    }

    pub fn post(&self, path: &str, body: &Value) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(&self.admin_token).json(body)
    }

    pub fn patch(&self, path: &str, body: &Value) -> RequestBuilder {
        self.client.patch(self.url(path)).bearer_auth(&self.admin_token).json(body)
    }

    pub fn put(&self, path: &str, body: &Value) -> RequestBuilder {
        self.client.put(self.url(path)).bearer_auth(&self.admin_token).json(body)
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(&self.admin_token)
    }
}

/// Sends `request`, checks the status and returns the JSON body.
pub async fn expect(request: RequestBuilder, status: StatusCode) -> Result<Value> {
    let res = request.send().await?;
    let actual = res.status();
    let body = res.json::<Value>().await.unwrap_or(Value::Null);
    anyhow::ensure!(actual == status, "expected {}, got {}: {}", status, actual, body);
    Ok(body)
}
