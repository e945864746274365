//! Request threads, direct chat with the administrator, and user management.
//!
//! Run with: cargo test -p fixflow-integration-tests

#![allow(clippy::expect_used, clippy::indexing_slicing)]

use fixflow_core::Role;
use fixflow_integration_tests::{TestServer, user_id};
use reqwest::StatusCode;
use serde_json::{Value, json};

fn texts(thread: &Value) -> Vec<&str> {
    thread
        .as_array()
        .expect("thread")
        .iter()
        .map(|m| m["message"].as_str().expect("message"))
        .collect()
}

fn names(profiles: &Value) -> Vec<&str> {
    profiles
        .as_array()
        .expect("profiles")
        .iter()
        .map(|p| p["name"].as_str().expect("name"))
        .collect()
}

// ============================================================================
// Request threads
// ============================================================================

#[tokio::test]
async fn test_request_thread_between_client_and_collaborator() {
    let server = TestServer::spawn().await;
    let (carla, _) = server.user(Role::Client, "carla").await;
    let (bruno, _) = server.user(Role::Collaborator, "bruno").await;
    let (erin, _) = server.user(Role::Client, "erin").await;

    let (_, request) = carla.open_request("Leaky faucet", "high", Vec::new()).await;
    let id = request["id"].as_i64().expect("request id");
    let thread = format!("/api/requests/{id}/messages");

    let (status, sent) = carla
        .post(&thread, json!({ "message": "It drips all night" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{sent}");
    assert_eq!(sent["sender_name"], "carla");

    let (status, _) = bruno
        .post(&thread, json!({ "message": "Is the shutoff valve reachable?" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, messages) = carla.get(&thread).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        texts(&messages),
        vec!["It drips all night", "Is the shutoff valve reachable?"]
    );

    let (status, _) = erin.get(&thread).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = erin.post(&thread, json!({ "message": "hello" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = carla.post(&thread, json!({ "message": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Direct chat
// ============================================================================

#[tokio::test]
async fn test_direct_chat_needs_an_administrator() {
    let server = TestServer::spawn().await;
    let (carla, _) = server.user(Role::Client, "carla").await;

    let (status, body) = carla.get("/api/direct/admin").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "no administrator available, cannot start chat");
}

#[tokio::test]
async fn test_direct_chat_with_administrator() {
    let server = TestServer::spawn().await;
    let (carla, carla_profile) = server.user(Role::Client, "carla").await;
    let (bruno, bruno_profile) = server.user(Role::Collaborator, "bruno").await;
    let (ada, ada_profile) = server.user(Role::Admin, "ada").await;

    let (status, contact) = carla.get("/api/direct/admin").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contact["id"], ada_profile["id"]);
    assert_eq!(contact["name"], "ada");

    let ada_id = user_id(&ada_profile);
    let carla_id = user_id(&carla_profile);

    let (status, _) = carla
        .post(
            &format!("/api/direct/{ada_id}/messages"),
            json!({ "message": "Can I change my address?" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = ada
        .post(
            &format!("/api/direct/{carla_id}/messages"),
            json!({ "message": "Yes, from your profile" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, from_carla) = carla.get(&format!("/api/direct/{ada_id}/messages")).await;
    let (_, from_ada) = ada.get(&format!("/api/direct/{carla_id}/messages")).await;
    assert_eq!(
        texts(&from_carla),
        vec!["Can I change my address?", "Yes, from your profile"]
    );
    assert_eq!(from_carla, from_ada);
    assert_eq!(from_carla[0]["sender_role"], "client");
    assert_eq!(from_carla[1]["sender_role"], "admin");

    // Bruno's channel with the admin is separate.
    let (_, bruno_thread) = bruno.get(&format!("/api/direct/{ada_id}/messages")).await;
    assert!(texts(&bruno_thread).is_empty());

    // Direct messages always involve the administrator.
    let bruno_id = user_id(&bruno_profile);
    let (status, _) = carla
        .post(
            &format!("/api/direct/{bruno_id}/messages"),
            json!({ "message": "Hi Bruno" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ada
        .post(
            &format!("/api/direct/{ada_id}/messages"),
            json!({ "message": "Note to self" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Administration
// ============================================================================

#[tokio::test]
async fn test_admin_promotes_and_deletes_users() {
    let server = TestServer::spawn().await;
    let (carla, carla_profile) = server.user(Role::Client, "carla").await;
    let (_gus, gus_profile) = server.user(Role::Client, "gus").await;
    let (ada, ada_profile) = server.user(Role::Admin, "ada").await;

    let (status, _) = carla.get("/api/admin/users").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, clients) = ada.get("/api/admin/users").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&clients), vec!["carla", "gus"]);

    let gus_id = user_id(&gus_profile);
    let (status, promoted) = ada
        .post_empty(&format!("/api/admin/users/{gus_id}/promote"))
        .await;
    assert_eq!(status, StatusCode::OK, "{promoted}");
    assert_eq!(promoted["role"], "collaborator");

    let (status, _) = ada
        .post_empty(&format!("/api/admin/users/{gus_id}/promote"))
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "already a collaborator");

    let (_, collaborators) = ada.get("/api/admin/users?role=collaborator").await;
    assert_eq!(names(&collaborators), vec!["gus"]);

    let (_, dash) = ada.get("/api/dashboard").await;
    assert_eq!(dash["role"], "admin");
    assert_eq!(names(&dash["clients"]), vec!["carla"]);
    assert_eq!(names(&dash["collaborators"]), vec!["gus"]);

    let ada_id = user_id(&ada_profile);
    let (status, _) = ada.delete(&format!("/api/admin/users/{ada_id}")).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "admins cannot delete themselves");

    let carla_id = user_id(&carla_profile);
    let (status, _) = ada.delete(&format!("/api/admin/users/{carla_id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The deleted user's session no longer resolves to a profile.
    let (status, _) = carla.get("/api/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, clients) = ada.get("/api/admin/users").await;
    assert!(names(&clients).is_empty());
}
