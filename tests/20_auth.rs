mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{expect, TestServer};
use layered_api::database::models::Role;

#[tokio::test]
async fn missing_or_bad_tokens_are_unauthorized() -> Result<()> {
    let server = TestServer::start().await?;

    let body = expect(server.client.get(server.url("/api/countries")), StatusCode::UNAUTHORIZED).await?;
    assert_eq!(body["code"], "UNAUTHORIZED");

    let garbage = server.client.get(server.url("/api/countries")).bearer_auth("not-a-jwt");
    expect(garbage, StatusCode::UNAUTHORIZED).await?;

    let unknown_user = server.client.get(server.url("/api/countries")).bearer_auth(server.token(4242)?);
    expect(unknown_user, StatusCode::UNAUTHORIZED).await?;
    Ok(())
}

#[tokio::test]
async fn deleted_and_inactive_users_are_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.token_for("temp@example.com", Role::Reader).await?;
    let me = expect(
        server.get("/api/users?search=temp@example.com"),
        StatusCode::OK,
    )
    .await?;
    let id = me["data"]["items"][0]["id"].as_i64().unwrap();

    expect(server.patch(&format!("/api/users/{}", id), &json!({ "is_active": false })), StatusCode::OK).await?;
    let inactive = server.client.get(server.url("/api/countries")).bearer_auth(&token);
    expect(inactive, StatusCode::FORBIDDEN).await?;

    expect(server.delete(&format!("/api/users/{}", id)), StatusCode::OK).await?;
    let deleted = server.client.get(server.url("/api/countries")).bearer_auth(&token);
    expect(deleted, StatusCode::UNAUTHORIZED).await?;
    Ok(())
}

#[tokio::test]
async fn readers_can_read_but_not_create() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.token_for("reader@example.com", Role::Reader).await?;

    let list = server.client.get(server.url("/api/countries")).bearer_auth(&token);
    expect(list, StatusCode::OK).await?;

    let create = server
        .client
        .post(server.url("/api/countries"))
        .bearer_auth(&token)
        .json(&json!({ "code": "CO", "name": "Colombia" }));
    let body = expect(create, StatusCode::FORBIDDEN).await?;
    assert_eq!(body["code"], "FORBIDDEN");
    Ok(())
}

#[tokio::test]
async fn managers_cannot_create_admins() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.token_for("manager@example.com", Role::Manager).await?;

    let escalate = server
        .client
        .post(server.url("/api/users"))
        .bearer_auth(&token)
        .json(&json!({ "email": "boss@example.com", "full_name": "Boss", "role": "admin" }));
    expect(escalate, StatusCode::FORBIDDEN).await?;

    let allowed = server
        .client
        .post(server.url("/api/users"))
        .bearer_auth(&token)
        .json(&json!({ "email": "clerk@example.com", "full_name": "Clerk", "role": "collaborator" }));
    let body = expect(allowed, StatusCode::CREATED).await?;
    assert_eq!(body["data"]["role"], "collaborator");
    Ok(())
}

#[tokio::test]
async fn permissions_depend_on_entity_and_action() -> Result<()> {
    let server = TestServer::start().await?;
    let co = expect(server.post("/api/countries", &json!({ "code": "CO", "name": "Colombia" })), StatusCode::CREATED).await?;
    let co_id = co["data"]["id"].as_i64().unwrap();
    let person = expect(
        server.post(
            "/api/individuals",
            &json!({ "document_type": "passport", "document_number": "P-1", "first_name": "Ana", "last_name": "Ruiz" }),
        ),
        StatusCode::CREATED,
    )
    .await?;
    let person_id = person["data"]["id"].as_i64().unwrap();

    let collaborator = server.token_for("collab@example.com", Role::Collaborator).await?;
    let profile_edit = server
        .client
        .patch(server.url(&format!("/api/individuals/{}", person_id)))
        .bearer_auth(&collaborator)
        .json(&json!({ "first_name": "Ana María" }));
    expect(profile_edit, StatusCode::OK).await?;

    let geography_edit = server
        .client
        .patch(server.url(&format!("/api/countries/{}", co_id)))
        .bearer_auth(&collaborator)
        .json(&json!({ "name": "República de Colombia" }));
    expect(geography_edit, StatusCode::FORBIDDEN).await?;

    // Account changes also need a manager, whatever the permission level.
    let account_edit = server
        .client
        .patch(server.url("/api/users/1"))
        .bearer_auth(&collaborator)
        .json(&json!({ "full_name": "Renamed" }));
    expect(account_edit, StatusCode::FORBIDDEN).await?;

    let guest = server.token_for("guest@example.com", Role::Guest).await?;
    let browse = server.client.get(server.url("/api/countries")).bearer_auth(&guest);
    expect(browse, StatusCode::OK).await?;
    let people = server.client.get(server.url("/api/individuals")).bearer_auth(&guest);
    expect(people, StatusCode::FORBIDDEN).await?;
    Ok(())
}
