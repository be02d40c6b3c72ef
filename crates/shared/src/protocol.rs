use serde::{Deserialize, Serialize};

use crate::{
    domain::{Coordinate, Post, PostId},
    error::ApiError,
};

pub const DEFAULT_RADIUS_KM: f64 = 5.0;
pub const DEFAULT_POST_TTL_SECONDS: i64 = 30;
/// Exclusive upper bound on a post's requested lifetime.
pub const MAX_POST_TTL_SECONDS: i64 = 3600;

pub fn posts_route() -> &'static str {
    "/posts"
}

pub fn health_route() -> &'static str {
    "/health"
}

/// Body of `POST /posts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub duration: i64,
    pub content: String,
    pub location: Coordinate,
}

impl CreatePostRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !self.location.is_valid() {
            return Err(ApiError::validation("invalid location"));
        }
        if self.content.is_empty() {
            return Err(ApiError::validation("content must not be empty"));
        }
        if self.duration <= 0 || self.duration >= MAX_POST_TTL_SECONDS {
            return Err(ApiError::validation(format!(
                "duration must be between 1 and {} seconds",
                MAX_POST_TTL_SECONDS - 1
            )));
        }
        Ok(())
    }

    pub fn into_post(self, created_at: i64) -> Post {
        Post {
            id: Some(PostId::new()),
            content: self.content,
            location: self.location,
            duration: self.duration,
            created_at,
        }
    }
}

/// Query string of `GET /posts`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearbyQuery {
    pub radius: f64,
    pub lat: f64,
    pub long: f64,
}

impl NearbyQuery {
    pub fn new(radius_km: f64, center: Coordinate) -> Self {
        Self {
            radius: radius_km,
            lat: center.latitude,
            long: center.longitude,
        }
    }

    pub fn validate(&self) -> Result<Coordinate, ApiError> {
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(ApiError::validation("radius must be a non-negative number"));
        }
        let center = Coordinate::new(self.lat, self.long)?;
        Ok(center)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
