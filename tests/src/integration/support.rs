//! Shared fixtures: both services over in-memory databases with one secret.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use fc_auth_service::AuthConfig;
use fc_flashcards_service::adapters::MemoryProjectionCache;
use fc_flashcards_service::FlashcardsConfig;
use serde_json::{json, Value};
use shared_http::RateLimitConfig;
use shared_types::TokenSigner;
use std::sync::Arc;
use tower::ServiceExt;
use txn_participant::open_connection;

pub const SHARED_SECRET: &str = "integration-secret";

/// A service under test, addressed through its router.
#[derive(Clone)]
pub struct Client {
    router: Router,
}

impl Client {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(body) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, None, Some(body)).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, None).await
    }
}

pub fn auth_service() -> Client {
    let config = AuthConfig {
        token_secret: SHARED_SECRET.into(),
        rate_limit: RateLimitConfig::disabled(),
        ..AuthConfig::default()
    };
    let signer = TokenSigner::new(&config.token_secret, config.token_ttl).unwrap();
    let app = fc_auth_service::build_app(
        &config,
        open_connection(":memory:").unwrap(),
        Arc::new(signer),
    )
    .unwrap();
    Client { router: app.router }
}

pub fn flashcards_service() -> Client {
    let config = FlashcardsConfig {
        token_secret: SHARED_SECRET.into(),
        rate_limit: RateLimitConfig::disabled(),
        ..FlashcardsConfig::default()
    };
    let verifier = Arc::new(TokenSigner::new(&config.token_secret, config.token_ttl).unwrap());
    let app = fc_flashcards_service::build_app(
        &config,
        open_connection(":memory:").unwrap(),
        Arc::new(MemoryProjectionCache::new()),
        verifier,
    )
    .unwrap();
    Client { router: app.router }
}

/// Register a user and log in, returning the access token.
pub async fn login(auth: &Client, username: &str, email: &str) -> String {
    let (status, _) = auth
        .post(
            "/auth/register",
            json!({"username": username, "email": email, "password": "password123"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = auth
        .post("/auth/login", json!({"email": email, "password": "password123"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}
