//! Test helpers for DSV server integration tests
//!
//! This module provides:
//! - A router wired to an in-memory mapping store
//! - Request helpers returning the status and JSON body
//! - Mapping fixtures (see [`fixtures`])

#![allow(dead_code)]

pub mod fixtures;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use dsv_server::{
    api::{self, AppState},
    config::Config,
    mapping::{InMemoryMappingStore, SharedMappingStore},
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub use fixtures::*;

/// Application under test
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryMappingStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryMappingStore::new());
        let shared: SharedMappingStore = store.clone();
        let router = api::create_router(AppState::with_store(shared), &Config::default());
        Self { router, store }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().method("GET").uri(uri).body(Body::empty()))
            .await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("PATCH")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
        )
        .await
    }

    async fn send(
        &self,
        request: Result<Request<Body>, axum::http::Error>,
    ) -> (StatusCode, Value) {
        let request = request.expect("Failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed to respond");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Response body is not JSON")
        };

        (status, json)
    }
}

/// URI of a mapping endpoint for a target data set version
pub fn mapping_uri(target_version_id: uuid::Uuid, endpoint: &str) -> String {
    format!("/api/v1/public-data/data-set-versions/{target_version_id}/mapping/{endpoint}")
}

/// Codes of the validation failures in a 400 response body
pub fn validation_codes(body: &Value) -> Vec<(String, String)> {
    body["error"]["details"]["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .map(|e| {
                    (
                        e["path"].as_str().unwrap_or_default().to_string(),
                        e["code"].as_str().unwrap_or_default().to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}
