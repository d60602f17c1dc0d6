mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{expect, TestServer};

fn person(document: &str) -> Value {
    json!({
        "document_type": "passport",
        "document_number": document,
        "first_name": "Lucía",
        "last_name": "Gómez",
        "hire_date": "2023-02-01"
    })
}

#[tokio::test]
async fn creates_user_and_profile_together() -> Result<()> {
    let server = TestServer::start().await?;

    let created = expect(
        server.post(
            "/api/individuals/with-user",
            &json!({
                "user": { "email": "lucia@example.com", "full_name": "Lucía Gómez", "role": "collaborator" },
                "individual": person("P-100")
            }),
        ),
        StatusCode::CREATED,
    )
    .await?;
    let user_id = created["data"]["user"]["id"].as_i64().unwrap();
    assert_eq!(created["data"]["individual"]["user_id"], user_id);
    assert_eq!(created["data"]["individual"]["status"], "active");

    let profile = expect(server.get(&format!("/api/individuals/by-user/{}", user_id)), StatusCode::OK).await?;
    assert_eq!(profile["data"]["document_number"], "P-100");
    Ok(())
}

#[tokio::test]
async fn failed_dual_create_leaves_no_user() -> Result<()> {
    let server = TestServer::start().await?;
    expect(server.post("/api/individuals", &person("P-100")), StatusCode::CREATED).await?;

    expect(
        server.post(
            "/api/individuals/with-user",
            &json!({
                "user": { "email": "second@example.com", "full_name": "Second" },
                "individual": person("P-100")
            }),
        ),
        StatusCode::CONFLICT,
    )
    .await?;

    let users = expect(server.get("/api/users?search=second@example.com"), StatusCode::OK).await?;
    assert_eq!(users["data"]["total"], 0);
    Ok(())
}

#[tokio::test]
async fn enumerated_values_are_checked() -> Result<()> {
    let server = TestServer::start().await?;
    let mut bad = person("P-100");
    bad["status"] = json!("retired");

    let body = expect(server.post("/api/individuals", &bad), StatusCode::UNPROCESSABLE_ENTITY).await?;
    let reason = body["field_errors"]["status"].as_str().unwrap();
    assert!(reason.contains("active, on_leave, suspended, terminated"), "{}", reason);

    let filter = expect(server.get("/api/individuals?status=retired"), StatusCode::UNPROCESSABLE_ENTITY).await?;
    assert!(filter["field_errors"]["status"].is_string());
    Ok(())
}

#[tokio::test]
async fn terminated_is_final() -> Result<()> {
    let server = TestServer::start().await?;
    let created = expect(server.post("/api/individuals", &person("P-100")), StatusCode::CREATED).await?;
    let id = created["data"]["id"].as_i64().unwrap();
    let status_url = format!("/api/individuals/{}/status", id);

    let body = expect(server.put(&status_url, &json!({ "status": "terminated" })), StatusCode::OK).await?;
    assert_eq!(body["data"]["status"], "terminated");
    expect(server.put(&status_url, &json!({ "status": "active" })), StatusCode::UNPROCESSABLE_ENTITY).await?;

    let listed = expect(server.get("/api/individuals?status=terminated"), StatusCode::OK).await?;
    assert_eq!(listed["data"]["total"], 1);
    Ok(())
}

#[tokio::test]
async fn patch_keeps_untouched_fields_and_clears_nulls() -> Result<()> {
    let server = TestServer::start().await?;
    let mut input = person("P-100");
    input["phone"] = json!("+57 300 000 0000");
    let created = expect(server.post("/api/individuals", &input), StatusCode::CREATED).await?;
    let id = created["data"]["id"].as_i64().unwrap();

    let updated = expect(
        server.patch(&format!("/api/individuals/{}", id), &json!({ "last_name": "Gómez Ruiz", "phone": null })),
        StatusCode::OK,
    )
    .await?;
    assert_eq!(updated["data"]["last_name"], "Gómez Ruiz");
    assert_eq!(updated["data"]["first_name"], "Lucía");
    assert_eq!(updated["data"]["phone"], Value::Null);
    assert_eq!(updated["data"]["hire_date"], "2023-02-01");

    let bad_json = server
        .client
        .patch(server.url(&format!("/api/individuals/{}", id)))
        .bearer_auth(&server.admin_token)
        .header("content-type", "application/json")
        .body("{ not json");
    expect(bad_json, StatusCode::BAD_REQUEST).await?;
    Ok(())
}

#[tokio::test]
async fn owners_and_locations_in_use_cannot_be_deleted() -> Result<()> {
    let server = TestServer::start().await?;
    let co = expect(server.post("/api/countries", &json!({ "code": "CO", "name": "Colombia" })), StatusCode::CREATED).await?;
    let co_id = co["data"]["id"].as_i64().unwrap();
    let ant = expect(
        server.post("/api/states", &json!({ "country_id": co_id, "code": "ANT", "name": "Antioquia" })),
        StatusCode::CREATED,
    )
    .await?;
    let ant_id = ant["data"]["id"].as_i64().unwrap();

    let mut profile = person("P-100");
    profile["country_id"] = json!(co_id);
    profile["state_id"] = json!(ant_id);
    let created = expect(
        server.post(
            "/api/individuals/with-user",
            &json!({ "user": { "email": "lucia@example.com", "full_name": "Lucía Gómez" }, "individual": profile }),
        ),
        StatusCode::CREATED,
    )
    .await?;
    let user_id = created["data"]["user"]["id"].as_i64().unwrap();
    let profile_id = created["data"]["individual"]["id"].as_i64().unwrap();

    let residents = expect(server.get(&format!("/api/states/{}/individuals", ant_id)), StatusCode::OK).await?;
    assert_eq!(residents["data"][0]["id"], profile_id);

    let body = expect(server.delete(&format!("/api/users/{}", user_id)), StatusCode::UNPROCESSABLE_ENTITY).await?;
    assert!(body["field_errors"]["individual"].is_string());
    let body = expect(server.delete(&format!("/api/states/{}", ant_id)), StatusCode::UNPROCESSABLE_ENTITY).await?;
    assert!(body["field_errors"]["individuals"].is_string());

    expect(server.delete(&format!("/api/individuals/{}", profile_id)), StatusCode::OK).await?;
    expect(server.delete(&format!("/api/users/{}", user_id)), StatusCode::OK).await?;
    expect(server.delete(&format!("/api/states/{}", ant_id)), StatusCode::OK).await?;
    expect(server.get(&format!("/api/states/{}/individuals", ant_id)), StatusCode::NOT_FOUND).await?;
    Ok(())
}

#[tokio::test]
async fn profiles_can_be_listed_by_status() -> Result<()> {
    let server = TestServer::start().await?;
    let created = expect(server.post("/api/individuals", &person("P-100")), StatusCode::CREATED).await?;
    let id = created["data"]["id"].as_i64().unwrap();
    expect(server.post("/api/individuals", &person("P-200")), StatusCode::CREATED).await?;
    expect(server.put(&format!("/api/individuals/{}/status", id), &json!({ "status": "on_leave" })), StatusCode::OK).await?;

    let on_leave = expect(server.get("/api/individuals/by-status/ON_LEAVE"), StatusCode::OK).await?;
    assert_eq!(on_leave["data"].as_array().unwrap().len(), 1);
    assert_eq!(on_leave["data"][0]["id"], id);

    let bad = expect(server.get("/api/individuals/by-status/retired"), StatusCode::UNPROCESSABLE_ENTITY).await?;
    assert!(bad["field_errors"]["status"].is_string());
    Ok(())
}
