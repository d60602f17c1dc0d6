mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{expect, TestServer};

#[tokio::test]
async fn create_read_update_delete_country() -> Result<()> {
    let server = TestServer::start().await?;

    let created = expect(
        server.post("/api/countries", &json!({ "code": "co", "name": "Colombia", "phone_code": "+57" })),
        StatusCode::CREATED,
    )
    .await?;
    let country = &created["data"];
    assert_eq!(country["code"], "CO");
    assert_eq!(country["is_active"], true);
    assert_eq!(country["is_deleted"], false);
    let id = country["id"].as_i64().unwrap();

    let by_code = expect(server.get("/api/countries/code/co"), StatusCode::OK).await?;
    assert_eq!(by_code["data"]["id"], id);

    let updated = expect(
        server.patch(&format!("/api/countries/{}", id), &json!({ "name": "República de Colombia" })),
        StatusCode::OK,
    )
    .await?;
    assert_eq!(updated["data"]["name"], "República de Colombia");
    assert_eq!(updated["data"]["phone_code"], "+57");
    assert_eq!(updated["data"]["created_at"], country["created_at"]);

    expect(server.delete(&format!("/api/countries/{}", id)), StatusCode::OK).await?;
    expect(server.delete(&format!("/api/countries/{}", id)), StatusCode::OK).await?;
    expect(server.get(&format!("/api/countries/{}", id)), StatusCode::NOT_FOUND).await?;
    Ok(())
}

#[tokio::test]
async fn validation_errors_list_fields() -> Result<()> {
    let server = TestServer::start().await?;

    let body = expect(
        server.post("/api/countries", &json!({ "code": "COL", "name": "", "phone_code": "57" })),
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .await?;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    for field in ["code", "name", "phone_code"] {
        assert!(body["field_errors"][field].is_string(), "missing {}: {}", field, body);
    }
    Ok(())
}

#[tokio::test]
async fn duplicates_conflict() -> Result<()> {
    let server = TestServer::start().await?;
    let country = json!({ "code": "MX", "name": "México" });

    expect(server.post("/api/countries", &country), StatusCode::CREATED).await?;
    let body = expect(server.post("/api/countries", &country), StatusCode::CONFLICT).await?;
    assert_eq!(body["code"], "CONFLICT");
    Ok(())
}

#[tokio::test]
async fn ids_must_be_positive_and_known() -> Result<()> {
    let server = TestServer::start().await?;

    expect(server.get("/api/countries/999"), StatusCode::NOT_FOUND).await?;
    let body = expect(server.get("/api/countries/0"), StatusCode::UNPROCESSABLE_ENTITY).await?;
    assert!(body["field_errors"]["id"].is_string());
    expect(server.get("/api/countries/-3"), StatusCode::UNPROCESSABLE_ENTITY).await?;
    expect(server.get("/api/countries/abc"), StatusCode::UNPROCESSABLE_ENTITY).await?;
    Ok(())
}

#[tokio::test]
async fn lists_are_paginated_and_searchable() -> Result<()> {
    let server = TestServer::start().await?;
    for (code, name) in [("AR", "Argentina"), ("CO", "Colombia"), ("ES", "España"), ("MX", "México"), ("US", "United States")] {
        expect(server.post("/api/countries", &json!({ "code": code, "name": name })), StatusCode::CREATED).await?;
    }

    let mut seen = vec![];
    for page in 1..=3 {
        let body = expect(
            server.get(&format!("/api/countries?page={}&per_page=2", page)),
            StatusCode::OK,
        )
        .await?;
        assert_eq!(body["data"]["total"], 5);
        assert_eq!(body["data"]["page"], page);
        for item in body["data"]["items"].as_array().unwrap() {
            seen.push(item["code"].as_str().unwrap().to_string());
        }
    }
    assert_eq!(seen, vec!["AR", "CO", "ES", "MX", "US"]);

    let found = expect(server.get("/api/countries?search=col"), StatusCode::OK).await?;
    assert_eq!(found["data"]["total"], 1);
    assert_eq!(found["data"]["items"][0]["code"], "CO");

    let sorted = expect(server.get("/api/countries?order_by=name&order_direction=desc&per_page=1"), StatusCode::OK).await?;
    assert_eq!(sorted["data"]["items"][0]["code"], "US");

    let bad = expect(server.get("/api/countries?per_page=1000&order_by=secret"), StatusCode::UNPROCESSABLE_ENTITY).await?;
    assert!(bad["field_errors"]["per_page"].is_string());
    assert!(bad["field_errors"]["order_by"].is_string());
    Ok(())
}

#[tokio::test]
async fn country_states_are_nested() -> Result<()> {
    let server = TestServer::start().await?;
    let co = expect(server.post("/api/countries", &json!({ "code": "CO", "name": "Colombia" })), StatusCode::CREATED).await?;
    let co_id = co["data"]["id"].as_i64().unwrap();

    for (code, name) in [("CUN", "Cundinamarca"), ("ANT", "Antioquia")] {
        expect(
            server.post("/api/states", &json!({ "country_id": co_id, "code": code, "name": name })),
            StatusCode::CREATED,
        )
        .await?;
    }

    let states = expect(server.get(&format!("/api/countries/{}/states", co_id)), StatusCode::OK).await?;
    let names: Vec<_> = states["data"].as_array().unwrap().iter().map(|s| s["name"].clone()).collect();
    assert_eq!(names, vec![json!("Antioquia"), json!("Cundinamarca")]);

    let filtered = expect(server.get(&format!("/api/states?country_id={}", co_id)), StatusCode::OK).await?;
    assert_eq!(filtered["data"]["total"], 2);

    // A country with visible states cannot be deleted.
    let body = expect(server.delete(&format!("/api/countries/{}", co_id)), StatusCode::UNPROCESSABLE_ENTITY).await?;
    assert!(body["field_errors"]["states"].is_string());
    Ok(())
}

#[tokio::test]
async fn far_pages_are_empty_or_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    expect(server.post("/api/countries", &json!({ "code": "CO", "name": "Colombia" })), StatusCode::CREATED).await?;

    let empty = expect(server.get("/api/countries?page=1000000000&per_page=1"), StatusCode::OK).await?;
    assert_eq!(empty["data"]["items"], json!([]));
    assert_eq!(empty["data"]["total"], 1);

    for page in ["1000000000", "9223372036854775807"] {
        let body = expect(server.get(&format!("/api/countries?page={}", page)), StatusCode::UNPROCESSABLE_ENTITY).await?;
        assert!(body["field_errors"]["page"].is_string());
    }
    Ok(())
}

#[tokio::test]
async fn active_countries_skip_disabled_ones() -> Result<()> {
    let server = TestServer::start().await?;
    expect(server.post("/api/countries", &json!({ "code": "MX", "name": "México" })), StatusCode::CREATED).await?;
    expect(
        server.post("/api/countries", &json!({ "code": "CO", "name": "Colombia", "is_active": false })),
        StatusCode::CREATED,
    )
    .await?;

    let active = expect(server.get("/api/countries/active"), StatusCode::OK).await?;
    let codes: Vec<_> = active["data"].as_array().unwrap().iter().map(|c| c["code"].clone()).collect();
    assert_eq!(codes, vec![json!("MX")]);
    Ok(())
}
