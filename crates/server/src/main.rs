use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::{header, Method, StatusCode},
    routing::get,
    Json, Router,
};
use server_api::{create_post, health, nearby_posts, ApiContext};
use shared::{
    domain::Post,
    error::{ApiError, ErrorCode},
    protocol::{health_route, posts_route, CreatePostRequest, HealthResponse, NearbyQuery},
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
};
use tracing::{error, info, warn};

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, static_dir_if_present};

const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;
const CORS_MAX_AGE: Duration = Duration::from_secs(300);

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let store = storage::open_store(settings.store);
    let state = Arc::new(AppState {
        api: ApiContext::new(store),
    });
    let static_dir = static_dir_if_present(&settings);
    if static_dir.is_none() {
        warn!(static_dir = %settings.static_dir.display(), "static directory missing; serving api only");
    }
    let app = build_router(Arc::clone(&state), static_dir);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, store = %settings.store, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(error) = state.api.store.close().await {
        error!(%error, "post store closed with error");
    }
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received interrupt, shutting down"),
        Err(error) => error!(%error, "failed to listen for interrupt signal"),
    }
}

fn build_router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
        .max_age(CORS_MAX_AGE);

    let api = Router::new()
        .route(health_route(), get(http_health).fallback(api_method_not_allowed))
        .route(
            posts_route(),
            get(http_nearby_posts)
                .post(http_create_post)
                .fallback(api_method_not_allowed),
        )
        .fallback(api_not_found)
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(cors)
        .with_state(state);

    let app = Router::new().nest("/api", api);
    match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    }
}

async fn http_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(health(&state.api).await)
}

async fn http_create_post(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreatePostRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let Json(request) = body.map_err(|rejection| {
        (
            rejection.status(),
            Json(ApiError::new(ErrorCode::Validation, rejection.body_text())),
        )
    })?;
    let post = create_post(&state.api, request)
        .await
        .map_err(into_response_error)?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn http_nearby_posts(
    State(state): State<Arc<AppState>>,
    query: Result<Query<NearbyQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Post>>> {
    let Query(query) = query.map_err(|rejection| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(
                ErrorCode::Validation,
                format!("error parsing query parameters: {}", rejection.body_text()),
            )),
        )
    })?;
    let posts = nearby_posts(&state.api, query)
        .await
        .map_err(into_response_error)?;
    Ok(Json(posts))
}

async fn api_not_found() -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::new(ErrorCode::NotFound, "not found")),
    )
}

async fn api_method_not_allowed() -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ApiError::new(ErrorCode::MethodNotAllowed, "method not allowed")),
    )
}

fn into_response_error(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
