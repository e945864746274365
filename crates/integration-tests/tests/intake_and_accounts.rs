//! Request intake validation and account flows.
//!
//! Run with: cargo test -p fixflow-integration-tests

#![allow(clippy::expect_used, clippy::indexing_slicing)]

use fixflow_core::Role;
use fixflow_core::validation::MAX_PHOTO_BYTES;
use fixflow_integration_tests::{PASSWORD, Photo, TestServer};
use reqwest::StatusCode;
use serde_json::json;

// ============================================================================
// Intake
// ============================================================================

#[tokio::test]
async fn test_intake_accepts_five_photos() {
    let server = TestServer::spawn().await;
    let (carla, _) = server.user(Role::Client, "carla").await;

    let photos = (0..5).map(|_| Photo::jpeg(128)).collect();
    let (status, request) = carla.open_request("Cracked window", "medium", photos).await;
    assert_eq!(status, StatusCode::CREATED, "{request}");
    assert_eq!(request["photos"].as_array().expect("photos").len(), 5);
}

#[tokio::test]
async fn test_intake_rejects_sixth_photo() {
    let server = TestServer::spawn().await;
    let (carla, _) = server.user(Role::Client, "carla").await;

    let photos = (0..6).map(|_| Photo::jpeg(128)).collect();
    let (status, body) = carla.open_request("Cracked window", "medium", photos).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "at most 5 photos can be attached");

    let (_, dash) = carla.get("/api/dashboard").await;
    assert!(dash["awaiting_quote"].as_array().expect("list").is_empty());
}

#[tokio::test]
async fn test_intake_rejects_gif() {
    let server = TestServer::spawn().await;
    let (carla, _) = server.user(Role::Client, "carla").await;

    let gif = Photo {
        content_type: "image/gif",
        bytes: b"GIF89a".to_vec(),
    };
    let (status, body) = carla
        .open_request("Loose hinge", "low", vec![Photo::png(16), gif])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "photo 1 must be a JPEG or PNG image, got image/gif"
    );
}

#[tokio::test]
async fn test_intake_rejects_oversized_photo() {
    let server = TestServer::spawn().await;
    let (carla, _) = server.user(Role::Client, "carla").await;

    let (status, body) = carla
        .open_request("Flooded basement", "high", vec![Photo::jpeg(MAX_PHOTO_BYTES + 1)])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["error"].as_str().expect("error").contains("larger than"));
}

#[tokio::test]
async fn test_intake_requires_description_and_known_priority() {
    let server = TestServer::spawn().await;
    let (carla, _) = server.user(Role::Client, "carla").await;

    let (status, _) = carla.open_request("   ", "low", Vec::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = carla.open_request("Squeaky door", "urgent", Vec::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_intake_requires_sign_in() {
    let server = TestServer::spawn().await;
    let anonymous = server.client();

    let (status, body) = anonymous.open_request("Leaky faucet", "low", Vec::new()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Sign in required");
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn test_sign_up_creates_client_without_signing_in() {
    let server = TestServer::spawn().await;
    let client = server.client();

    let (status, profile) = client.sign_up("nina@fixflow.test", "nina").await;
    assert_eq!(status, StatusCode::CREATED, "{profile}");
    assert_eq!(profile["role"], "client");
    assert_eq!(profile["email"], "nina@fixflow.test");

    let (status, _) = client.get("/api/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = client.sign_up("NINA@fixflow.test", "nina again").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_sign_up_validation() {
    let server = TestServer::spawn().await;
    let client = server.client();

    let (status, _) = client
        .post(
            "/auth/sign-up",
            json!({
                "email": "short@fixflow.test",
                "password": "abc",
                "name": "Short",
                "phone": "555-0100",
                "address": "Short Street 1",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = client
        .post(
            "/auth/sign-up",
            json!({
                "email": "not-an-email",
                "password": PASSWORD,
                "name": "Nobody",
                "phone": "555-0100",
                "address": "Nowhere 1",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sign_in_update_and_sign_out() {
    let server = TestServer::spawn().await;
    let (carla, _) = server.user(Role::Client, "carla").await;

    let (status, _) = server
        .client()
        .sign_in("carla@fixflow.test", "wrong-password-here")
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, me) = carla
        .patch("/api/me", json!({ "address": "Elm Street 9" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{me}");
    assert_eq!(me["address"], "Elm Street 9");
    assert_eq!(me["name"], "carla");

    let (status, _) = carla.patch("/api/me", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = carla.post_empty("/auth/sign-out").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = carla.get("/api/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
