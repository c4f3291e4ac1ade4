//! Feature modules implementing the tabsynth API
//!
//! Each feature is a vertical slice with its own commands, queries and routes.
//!
//! # Features
//!
//! - **users**: account registration
//! - **datasets**: upload, synthesis, evaluation, downloads and deletion
//!
//! Commands and queries implement the mediator pattern using the `mediator`
//! crate; every handler is a plain `handle(ctx, request)` function.

pub mod datasets;
pub mod shared;
pub mod users;

use crate::context::AppContext;
use crate::middleware;
use axum::Router;

/// Creates the API router with all feature routes mounted
///
/// - `/users` - Account registration
/// - `/datasets` - Dataset operations, all requiring Basic credentials
pub fn router(ctx: AppContext) -> Router<()> {
    let upload_limit = middleware::upload_limit(ctx.config.storage.max_upload_bytes);

    Router::new()
        .nest("/users", users::users_routes().with_state(ctx.clone()))
        .nest(
            "/datasets",
            datasets::datasets_routes()
                .layer(upload_limit)
                .with_state(ctx),
        )
}
