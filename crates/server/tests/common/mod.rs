//! Test harness for HTTP API tests.
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot` over an
//! in-memory ledger, so no sockets are opened.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use campus_ledger_server::{AppState, build_router};
use campus_ledger_test_utils::{TestLedger, in_memory_ledger};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

/// A router and the ledger behind it.
pub struct TestApp {
    pub router: Router,
    pub ledger: TestLedger,
}

impl TestApp {
    /// Router over a fresh in-memory ledger with the test configuration.
    pub fn new() -> Self {
        let ledger = in_memory_ledger();
        let state = AppState {
            referrals: ledger.referrals.clone(),
            sessions: ledger.sessions.clone(),
        };
        Self { router: build_router(state), ledger }
    }

    /// Sends one request and returns the status and parsed JSON body.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send_request(request).await
    }

    /// Sends a prepared request.
    pub async fn send_request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    /// `GET` with optional headers.
    pub async fn get(&self, uri: &str, headers: &[(&str, &str)]) -> (StatusCode, Value) {
        self.send(Method::GET, uri, headers, None).await
    }

    /// `POST` with a JSON body.
    pub async fn post(&self, uri: &str, headers: &[(&str, &str)], body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, headers, Some(body)).await
    }

    /// Registers a student through the API and returns `(id, referral_code)`.
    pub async fn register(&self, name: &str) -> (u64, String) {
        let (status, json) = self.post("/students", &[], serde_json::json!({ "name": name })).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {json}");
        let data = &json["data"];
        (data["id"].as_u64().unwrap(), data["referralCode"].as_str().unwrap().to_string())
    }

    /// Applies `code` as student `id`.
    pub async fn apply(&self, id: u64, code: &str) -> (StatusCode, Value) {
        let id = id.to_string();
        self.post("/referral/apply", &[("x-student-id", &id)], serde_json::json!({ "code": code }))
            .await
    }

    /// Issues a session for `user` and returns the refresh token.
    pub async fn login(&self, user: u64) -> String {
        let (status, json) =
            self.post("/auth/sessions", &[], serde_json::json!({ "userId": user })).await;
        assert_eq!(status, StatusCode::CREATED, "login failed: {json}");
        json["data"]["refreshToken"].as_str().unwrap().to_string()
    }

    /// Presents `token` to the refresh endpoint.
    pub async fn refresh(&self, token: &str) -> (StatusCode, Value) {
        self.post("/auth/refresh", &[], serde_json::json!({ "refreshToken": token })).await
    }
}
