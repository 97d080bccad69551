#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use sports_events_server::auth::jwt::JwtConfig;
use sports_events_server::config::Config;
use sports_events_server::db::{MemoryRepository, SharedRepository};
use sports_events_server::routes::create_routes;
use sports_events_server::state::AppState;

pub const PASSWORD: &str = "test_password_123!";
pub const PRIVILEGED: &str = "lyvens";

pub fn test_config() -> Config {
    Config {
        database_url: None,
        max_connections: 1,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 1,
        },
        privileged_usernames: HashSet::from([PRIVILEGED.to_string()]),
        cors_allowed_origins: Some("http://localhost:5173".to_string()),
        production: false,
    }
}

pub struct TestApp {
    pub router: Router,
    pub repo: SharedRepository,
}

/// Full router over a fresh in-memory repository.
pub fn build_test_app() -> TestApp {
    let repo: SharedRepository = Arc::new(MemoryRepository::new());
    let router = create_routes(AppState::new(repo.clone(), test_config()));
    TestApp { router, repo }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Response {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Register `username` through the API and return its id.
    pub async fn register(&self, username: &str) -> i64 {
        let response = self
            .post(
                "/api/accounts/register/",
                None,
                json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["id"].as_i64().unwrap()
    }

    /// Log `username` in and return the access token.
    pub async fn login(&self, username: &str) -> String {
        let response = self
            .post(
                "/api/token/",
                None,
                json!({ "username": username, "password": PASSWORD }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["access"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Register and log in; returns `(user_id, access_token)`.
    pub async fn signed_in(&self, username: &str) -> (i64, String) {
        let id = self.register(username).await;
        (id, self.login(username).await)
    }

    /// Create an event as `token` and return its JSON representation.
    pub async fn create_event(&self, token: &str, title: &str) -> Value {
        let response = self
            .post("/api/events/", Some(token), event_payload(title, 3))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }
}

pub fn event_payload(title: &str, days_ahead: i64) -> Value {
    json!({
        "title": title,
        "description": "Weekly game",
        "sport_type": "FOOT",
        "date": (Utc::now() + Duration::days(days_ahead)).to_rfc3339(),
        "location": "Park",
        "address": "1 Main St",
    })
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
