use std::sync::Arc;

use chrono::Utc;
use shared::{
    domain::Post,
    error::{ApiError, ErrorCode},
    protocol::{CreatePostRequest, HealthResponse, NearbyQuery},
};
use storage::PostStore;
use tracing::{error, info};

#[derive(Clone)]
pub struct ApiContext {
    pub store: Arc<dyn PostStore>,
}

impl ApiContext {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }
}

pub async fn health(ctx: &ApiContext) -> HealthResponse {
    HealthResponse {
        healthy: ctx.store.health_check().await.is_ok(),
    }
}

pub async fn create_post(ctx: &ApiContext, request: CreatePostRequest) -> Result<Post, ApiError> {
    request.validate()?;
    let post = request.into_post(Utc::now().timestamp());
    ctx.store.save_post(post.clone()).await.map_err(internal)?;
    info!(
        post_id = ?post.id,
        latitude = post.location.latitude,
        longitude = post.location.longitude,
        duration = post.duration,
        "post created"
    );
    Ok(post)
}

pub async fn nearby_posts(ctx: &ApiContext, query: NearbyQuery) -> Result<Vec<Post>, ApiError> {
    let center = query.validate()?;
    ctx.store
        .nearby_posts(center, query.radius)
        .await
        .map_err(internal)
}

fn internal(err: anyhow::Error) -> ApiError {
    error!(error = %err, "post store failure");
    ApiError::new(ErrorCode::Internal, "storage error")
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
