//! A repair request from intake to completion, over HTTP.
//!
//! Run with: cargo test -p fixflow-integration-tests

#![allow(clippy::expect_used, clippy::indexing_slicing)]

use fixflow_core::Role;
use fixflow_core::agenda::DEFAULT_AGENDA_DESCRIPTION;
use fixflow_integration_tests::{Photo, TestServer};
use reqwest::StatusCode;
use serde_json::{Value, json};

fn ids(list: &Value) -> Vec<i64> {
    list.as_array()
        .expect("array")
        .iter()
        .map(|r| r["id"].as_i64().expect("id"))
        .collect()
}

fn quote_body() -> Value {
    json!({
        "price": "150.00",
        "labor_description": "Replace cartridge",
        "materials_list": "Cartridge, washers",
        "suggested_execution_date": "2030-01-10T09:00:00Z",
    })
}

// ============================================================================
// Full lifecycle
// ============================================================================

#[tokio::test]
async fn test_leaky_faucet_from_intake_to_completion() {
    let server = TestServer::spawn().await;
    let (carla, _) = server.user(Role::Client, "carla").await;
    let (bruno, bruno_profile) = server.user(Role::Collaborator, "bruno").await;

    // Intake
    let (status, request) = carla
        .open_request("Leaky faucet", "high", vec![Photo::png(64)])
        .await;
    assert_eq!(status, StatusCode::CREATED, "{request}");
    assert_eq!(request["status"], "pending");
    assert_eq!(request["priority"], "high");
    assert_eq!(request["client_name"], "carla");
    assert!(request["assigned_collaborator_id"].is_null());
    let photo = request["photos"][0].as_str().expect("photo");
    assert!(photo.starts_with("data:image/png;base64,"));
    let id = request["id"].as_i64().expect("request id");

    let (_, dash) = carla.get("/api/dashboard").await;
    assert_eq!(dash["role"], "client");
    assert_eq!(ids(&dash["awaiting_quote"]), vec![id]);

    let (_, dash) = bruno.get("/api/dashboard").await;
    assert_eq!(dash["role"], "collaborator");
    assert_eq!(ids(&dash["open_requests"]), vec![id]);

    // Quote
    let (status, quoted) = bruno
        .post(&format!("/api/requests/{id}/quote"), quote_body())
        .await;
    assert_eq!(status, StatusCode::CREATED, "{quoted}");
    assert_eq!(quoted["request"]["status"], "responded");
    assert_eq!(
        quoted["request"]["assigned_collaborator_id"],
        bruno_profile["id"]
    );
    assert_eq!(quoted["quote"]["price"], "150.00");

    let (status, details) = carla.get(&format!("/api/requests/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["quote"]["labor_description"], "Replace cartridge");
    assert_eq!(details["client"]["name"], "carla");

    let (_, dash) = carla.get("/api/dashboard").await;
    assert_eq!(ids(&dash["quotes_to_review"]), vec![id]);

    // Accept
    let (status, accepted) = carla.post_empty(&format!("/api/requests/{id}/accept")).await;
    assert_eq!(status, StatusCode::OK, "{accepted}");
    assert_eq!(accepted["status"], "closed_by_client");

    // Schedule, then reschedule
    let (status, scheduled) = bruno
        .post(
            &format!("/api/requests/{id}/schedule"),
            json!({ "execution_date": "2030-01-10T09:00:00Z" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{scheduled}");
    assert_eq!(scheduled["request"]["status"], "scheduled");
    assert_eq!(scheduled["agenda_item"]["client_name"], "carla");
    assert_eq!(scheduled["agenda_item"]["client_address"], "carla Street 1");
    assert_eq!(
        scheduled["agenda_item"]["description"],
        DEFAULT_AGENDA_DESCRIPTION
    );
    let agenda_id = scheduled["agenda_item"]["id"].as_i64().expect("agenda id");

    let (status, moved) = bruno
        .post(
            &format!("/api/requests/{id}/schedule"),
            json!({ "execution_date": "2030-01-12T14:30:00Z" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{moved}");
    assert_eq!(moved["agenda_item"]["id"].as_i64(), Some(agenda_id));
    assert_eq!(moved["request"]["execution_date"], "2030-01-12T14:30:00Z");

    let (_, day) = bruno.get("/api/agenda?date=2030-01-10").await;
    assert!(day["items"].as_array().expect("items").is_empty());

    let (status, day) = bruno.get("/api/agenda?date=2030-01-12").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&day["items"]), vec![agenda_id]);
    let days = day["service_days"].as_array().expect("service days");
    assert!(days.contains(&json!(12)));
    assert!(!days.contains(&json!(10)));

    let (_, dash) = carla.get("/api/dashboard").await;
    assert_eq!(ids(&dash["scheduled"]), vec![id]);

    // Complete
    let (status, done) = bruno
        .post_empty(&format!("/api/agenda/{agenda_id}/complete"))
        .await;
    assert_eq!(status, StatusCode::OK, "{done}");
    assert_eq!(done["request"]["status"], "completed");
    assert!(done["request"]["completed_at"].is_string());
    assert_eq!(done["agenda_item"]["status"], "completed");

    let (_, dash) = carla.get("/api/dashboard").await;
    assert_eq!(ids(&dash["history"]), vec![id]);

    let (_, dash) = bruno.get("/api/dashboard").await;
    assert_eq!(ids(&dash["finished"]), vec![id]);
    assert!(dash["open_requests"].as_array().expect("open").is_empty());

    // Nothing moves after completion
    let (status, _) = carla.post_empty(&format!("/api/requests/{id}/accept")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = bruno
        .post(
            &format!("/api/requests/{id}/schedule"),
            json!({ "execution_date": "2030-02-01T09:00:00Z" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// ============================================================================
// Claims and guards
// ============================================================================

#[tokio::test]
async fn test_second_collaborator_cannot_claim_or_see() {
    let server = TestServer::spawn().await;
    let (carla, _) = server.user(Role::Client, "carla").await;
    let (bruno, _) = server.user(Role::Collaborator, "bruno").await;
    let (dora, _) = server.user(Role::Collaborator, "dora").await;

    let (_, request) = carla.open_request("Broken tile", "low", Vec::new()).await;
    let id = request["id"].as_i64().expect("request id");

    let (status, _) = dora.get(&format!("/api/requests/{id}")).await;
    assert_eq!(status, StatusCode::OK, "open requests are visible to all collaborators");

    let (status, _) = bruno
        .post(&format!("/api/requests/{id}/quote"), quote_body())
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = dora
        .post(&format!("/api/requests/{id}/quote"), quote_body())
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        "request has already been claimed by another collaborator"
    );

    let (status, body) = dora.get(&format!("/api/requests/{id}")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "access restricted");

    let (_, dash) = dora.get("/api/dashboard").await;
    assert!(dash["open_requests"].as_array().expect("open").is_empty());
}

#[tokio::test]
async fn test_actions_out_of_role_or_order() {
    let server = TestServer::spawn().await;
    let (carla, _) = server.user(Role::Client, "carla").await;
    let (erin, _) = server.user(Role::Client, "erin").await;
    let (bruno, _) = server.user(Role::Collaborator, "bruno").await;

    let (status, _) = bruno.open_request("Not mine", "low", Vec::new()).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "collaborators do not open requests");

    let (_, request) = carla.open_request("Dripping pipe", "medium", Vec::new()).await;
    let id = request["id"].as_i64().expect("request id");

    let (status, _) = erin.get(&format!("/api/requests/{id}")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = carla
        .post(&format!("/api/requests/{id}/quote"), quote_body())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "clients do not quote");

    let (status, _) = carla.post_empty(&format!("/api/requests/{id}/accept")).await;
    assert_eq!(status, StatusCode::CONFLICT, "nothing to accept yet");

    let (status, body) = bruno
        .post(
            &format!("/api/requests/{id}/quote"),
            json!({ "labor_description": "Reseal joint" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = bruno
        .post(&format!("/api/requests/{id}/quote"), quote_body())
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = erin.post_empty(&format!("/api/requests/{id}/accept")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = bruno
        .post(
            &format!("/api/requests/{id}/schedule"),
            json!({ "execution_date": "2030-01-10T09:00:00Z" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "quote not accepted yet");

    let (status, _) = bruno.get("/api/requests/999999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = carla.get("/api/agenda").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
