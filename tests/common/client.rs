//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all catalog endpoints.
//!
//! When API routes or request formats change, update only this file.
#![allow(dead_code)]

use super::constants::*;
use reqwest::{Method, Response};
use serde_json::Value;
use std::time::Duration;

const CATALOGS_PREFIX: &str = "/api/v1/catalogs";

/// HTTP test client
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Response {
        let mut request = self.client.request(method.clone(), self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        request
            .send()
            .await
            .unwrap_or_else(|e| panic!("{} {} failed: {}", method, path, e))
    }

    fn collection(entity: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}/{}/", CATALOGS_PREFIX, entity)
        } else {
            format!("{}/{}/?{}", CATALOGS_PREFIX, entity, query)
        }
    }

    fn member(entity: &str, id: i64) -> String {
        format!("{}/{}/{}/", CATALOGS_PREFIX, entity, id)
    }

    // ========================================================================
    // Raw Access
    // ========================================================================

    /// GET any path on the server
    pub async fn get_path(&self, path: &str) -> Response {
        self.send(Method::GET, path, None).await
    }

    /// POST a raw body with the given content type
    pub async fn post_raw(&self, path: &str, content_type: &str, body: &str) -> Response {
        self.client
            .post(self.url(path))
            .header("content-type", content_type)
            .body(body.to_string())
            .send()
            .await
            .expect("Raw POST request failed")
    }

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.get_path("/").await
    }

    // ========================================================================
    // Artist Endpoints
    // ========================================================================

    /// GET /api/v1/catalogs/artists/?{query}
    pub async fn list_artists(&self, query: &str) -> Response {
        self.get_path(&Self::collection("artists", query)).await
    }

    /// GET /api/v1/catalogs/artists/{id}/
    pub async fn get_artist(&self, id: i64) -> Response {
        self.get_path(&Self::member("artists", id)).await
    }

    /// POST /api/v1/catalogs/artists/
    pub async fn create_artist(&self, body: &Value) -> Response {
        self.send(Method::POST, &Self::collection("artists", ""), Some(body))
            .await
    }

    /// PUT /api/v1/catalogs/artists/{id}/
    pub async fn update_artist(&self, id: i64, body: &Value) -> Response {
        self.send(Method::PUT, &Self::member("artists", id), Some(body))
            .await
    }

    /// PATCH /api/v1/catalogs/artists/{id}/
    pub async fn patch_artist(&self, id: i64, body: &Value) -> Response {
        self.send(Method::PATCH, &Self::member("artists", id), Some(body))
            .await
    }

    /// DELETE /api/v1/catalogs/artists/{id}/
    pub async fn delete_artist(&self, id: i64) -> Response {
        self.send(Method::DELETE, &Self::member("artists", id), None)
            .await
    }

    // ========================================================================
    // Song Endpoints
    // ========================================================================

    /// GET /api/v1/catalogs/songs/?{query}
    pub async fn list_songs(&self, query: &str) -> Response {
        self.get_path(&Self::collection("songs", query)).await
    }

    /// GET /api/v1/catalogs/songs/{id}/
    pub async fn get_song(&self, id: i64) -> Response {
        self.get_path(&Self::member("songs", id)).await
    }

    /// POST /api/v1/catalogs/songs/
    pub async fn create_song(&self, body: &Value) -> Response {
        self.send(Method::POST, &Self::collection("songs", ""), Some(body))
            .await
    }

    /// PUT /api/v1/catalogs/songs/{id}/
    pub async fn update_song(&self, id: i64, body: &Value) -> Response {
        self.send(Method::PUT, &Self::member("songs", id), Some(body))
            .await
    }

    /// PATCH /api/v1/catalogs/songs/{id}/
    pub async fn patch_song(&self, id: i64, body: &Value) -> Response {
        self.send(Method::PATCH, &Self::member("songs", id), Some(body))
            .await
    }

    /// DELETE /api/v1/catalogs/songs/{id}/
    pub async fn delete_song(&self, id: i64) -> Response {
        self.send(Method::DELETE, &Self::member("songs", id), None)
            .await
    }

    // ========================================================================
    // Album Endpoints
    // ========================================================================

    /// GET /api/v1/catalogs/albums/?{query}
    pub async fn list_albums(&self, query: &str) -> Response {
        self.get_path(&Self::collection("albums", query)).await
    }

    /// GET /api/v1/catalogs/albums/{id}/
    pub async fn get_album(&self, id: i64) -> Response {
        self.get_path(&Self::member("albums", id)).await
    }

    /// POST /api/v1/catalogs/albums/
    pub async fn create_album(&self, body: &Value) -> Response {
        self.send(Method::POST, &Self::collection("albums", ""), Some(body))
            .await
    }

    /// PUT /api/v1/catalogs/albums/{id}/
    pub async fn update_album(&self, id: i64, body: &Value) -> Response {
        self.send(Method::PUT, &Self::member("albums", id), Some(body))
            .await
    }

    /// PATCH /api/v1/catalogs/albums/{id}/
    pub async fn patch_album(&self, id: i64, body: &Value) -> Response {
        self.send(Method::PATCH, &Self::member("albums", id), Some(body))
            .await
    }

    /// DELETE /api/v1/catalogs/albums/{id}/
    pub async fn delete_album(&self, id: i64) -> Response {
        self.send(Method::DELETE, &Self::member("albums", id), None)
            .await
    }
}
