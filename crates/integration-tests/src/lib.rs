//! End-to-end tests for the FixFlow API.
//!
//! Each test spawns the real router on an ephemeral port, backed by the
//! in-memory store, the local identity provider and in-memory sessions, then
//! drives it over HTTP with one cookie-carrying client per user.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p fixflow-integration-tests
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let server = TestServer::spawn().await;
//! let (carla, profile) = server.user(Role::Client, "carla").await;
//! let (status, me) = carla.get("/api/me").await;
//! assert_eq!(status, StatusCode::OK);
//! ```

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use fixflow_core::{Role, UserId};
use fixflow_server::config::{ServerConfig, StoreBackend};
use fixflow_server::db::{MemoryStore, ProfileStore};
use fixflow_server::services::LocalIdentityProvider;
use fixflow_server::state::AppState;

/// Password used for every test account.
pub const PASSWORD: &str = "correct-horse-battery";

/// A running API server.
pub struct TestServer {
    base_url: String,
    store: Arc<MemoryStore>,
}

fn test_config(addr: SocketAddr) -> ServerConfig {
    ServerConfig {
        database_url: None,
        host: addr.ip(),
        port: addr.port(),
        base_url: format!("http://{addr}"),
        session_secret: SecretString::from("kR9#mQ2$vL7@nP4&xW8!jT3*bY6^cF1%"),
        store: StoreBackend::Memory,
        identity: None,
        log_json: false,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

impl TestServer {
    /// Start a fresh server with empty stores.
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            test_config(addr),
            store.clone(),
            Arc::new(LocalIdentityProvider::new()),
        );
        let app = fixflow_server::app(state, tower_sessions::MemoryStore::default());

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server");
        });

        Self {
            base_url: format!("http://{addr}"),
            store,
        }
    }

    /// A new client with its own cookie jar.
    pub fn client(&self) -> TestClient {
        TestClient {
            http: Client::builder()
                .cookie_store(true)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: self.base_url.clone(),
        }
    }

    /// Sign up `name` (as `name@fixflow.test`), give them `role`, and return a
    /// signed-in client with their profile.
    pub async fn user(&self, role: Role, name: &str) -> (TestClient, Value) {
        let client = self.client();
        let email = format!("{name}@fixflow.test");

        let (status, profile) = client.sign_up(&email, name).await;
        assert_eq!(status, StatusCode::CREATED, "sign-up {name}: {profile}");

        if role != Role::Client {
            self.store
                .update_role(user_id(&profile), Role::Client, role)
                .await
                .expect("set role");
        }

        let (status, profile) = client.sign_in(&email, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "sign-in {name}: {profile}");
        (client, profile)
    }
}

/// Read the `id` of a profile body.
pub fn user_id(profile: &Value) -> UserId {
    profile["id"]
        .as_str()
        .expect("profile id")
        .parse()
        .expect("profile id is a UUID")
}

/// A photo part for the intake form.
pub struct Photo {
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Photo {
    pub fn png(len: usize) -> Self {
        Self {
            content_type: "image/png",
            bytes: vec![0x89; len],
        }
    }

    pub fn jpeg(len: usize) -> Self {
        Self {
            content_type: "image/jpeg",
            bytes: vec![0xFF; len],
        }
    }
}

/// One user's HTTP session against a [`TestServer`].
pub struct TestClient {
    http: Client,
    base_url: String,
}

impl TestClient {
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.expect("request failed");
        read(response).await
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.send(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn post_empty(&self, path: &str) -> (StatusCode, Value) {
        self.send(Method::POST, path, None).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, path, None).await
    }

    pub async fn sign_up(&self, email: &str, name: &str) -> (StatusCode, Value) {
        self.post(
            "/auth/sign-up",
            json!({
                "email": email,
                "password": PASSWORD,
                "name": name,
                "phone": "555-0100",
                "address": format!("{name} Street 1"),
            }),
        )
        .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.post(
            "/auth/sign-in",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Submit the multipart intake form.
    pub async fn open_request(
        &self,
        description: &str,
        priority: &str,
        photos: Vec<Photo>,
    ) -> (StatusCode, Value) {
        let mut form = Form::new()
            .text("description", description.to_owned())
            .text("priority", priority.to_owned());
        for (index, photo) in photos.into_iter().enumerate() {
            let part = Part::bytes(photo.bytes)
                .file_name(format!("photo-{index}"))
                .mime_str(photo.content_type)
                .expect("valid mime");
            form = form.part("photos", part);
        }

        let response = self
            .http
            .post(format!("{}/api/requests", self.base_url))
            .multipart(form)
            .send()
            .await
            .expect("request failed");
        read(response).await
    }
}

async fn read(response: reqwest::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.bytes().await.expect("response body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}
