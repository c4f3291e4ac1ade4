pub mod response;

use crate::context::AppContext;
use crate::{db, features, middleware};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;

/// Build the full application: service routes, `/api/v1` features and the
/// middleware stack.
pub fn create_router(ctx: AppContext) -> Router {
    let api_v1 = features::router(ctx.clone());
    let cors = middleware::cors_layer(&ctx.config.cors);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(ctx)
        .nest("/api/v1", api_v1)
        .layer(middleware::tracing_layer())
        .layer(cors)
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Tabsynth Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn health(State(ctx): State<AppContext>) -> impl IntoResponse {
    match db::health_check(&ctx.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        ),
        Err(e) => {
            tracing::error!("Database health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "database": "disconnected"
                })),
            )
        },
    }
}
