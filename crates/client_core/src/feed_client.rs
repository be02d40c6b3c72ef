//! HTTP access to the remote feed service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Coordinate, Post},
    protocol::{health_route, posts_route, CreatePostRequest, HealthResponse, NearbyQuery},
};
use tracing::debug;

use crate::error::FeedError;

/// The two remote operations the controller depends on.
#[async_trait]
pub trait FeedApi: Send + Sync {
    /// Not idempotent; implementations must not retry.
    async fn submit_post(
        &self,
        location: Coordinate,
        content: &str,
        ttl_seconds: i64,
    ) -> Result<Post, FeedError>;

    async fn fetch_nearby(&self, radius_km: f64, center: Coordinate)
        -> Result<Vec<Post>, FeedError>;
}

#[derive(Debug, Clone, Default)]
pub struct FeedClientConfig {
    /// Applied to every request. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct FeedClient {
    http: Client,
    base_url: String,
}

impl FeedClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: normalize_base_url(base_url.into()),
        }
    }

    pub fn with_config(
        base_url: impl Into<String>,
        config: &FeedClientConfig,
    ) -> Result<Self, FeedError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| FeedError::InvalidConfig(err.to_string()))?;
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url.into()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn submit_post(
        &self,
        location: Coordinate,
        content: &str,
        ttl_seconds: i64,
    ) -> Result<Post, FeedError> {
        debug!(
            latitude = location.latitude,
            longitude = location.longitude,
            ttl_seconds,
            "submitting post"
        );
        let request = self
            .http
            .post(format!("{}{}", self.base_url, posts_route()))
            .json(&CreatePostRequest {
                duration: ttl_seconds,
                content: content.to_string(),
                location,
            });
        send_json("submit_post", request).await
    }

    pub async fn fetch_nearby(
        &self,
        radius_km: f64,
        center: Coordinate,
    ) -> Result<Vec<Post>, FeedError> {
        debug!(
            radius_km,
            latitude = center.latitude,
            longitude = center.longitude,
            "fetching nearby posts"
        );
        let request = self
            .http
            .get(format!("{}{}", self.base_url, posts_route()))
            .query(&NearbyQuery::new(radius_km, center));
        send_json("fetch_nearby", request).await
    }

    pub async fn health(&self) -> Result<bool, FeedError> {
        let request = self
            .http
            .get(format!("{}{}", self.base_url, health_route()));
        let response: HealthResponse = send_json("health", request).await?;
        Ok(response.healthy)
    }
}

#[async_trait]
impl FeedApi for FeedClient {
    async fn submit_post(
        &self,
        location: Coordinate,
        content: &str,
        ttl_seconds: i64,
    ) -> Result<Post, FeedError> {
        FeedClient::submit_post(self, location, content, ttl_seconds).await
    }

    async fn fetch_nearby(
        &self,
        radius_km: f64,
        center: Coordinate,
    ) -> Result<Vec<Post>, FeedError> {
        FeedClient::fetch_nearby(self, radius_km, center).await
    }
}

async fn send_json<T: DeserializeOwned>(
    operation: &'static str,
    request: RequestBuilder,
) -> Result<T, FeedError> {
    request
        .send()
        .await
        .map_err(|err| FeedError::network(operation, err))?
        .error_for_status()
        .map_err(|err| FeedError::network(operation, err))?
        .json()
        .await
        .map_err(|err| FeedError::network(operation, err))
}

fn normalize_base_url(raw: String) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
#[path = "tests/feed_client_tests.rs"]
mod tests;
