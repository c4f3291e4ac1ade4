//! Tabsynth Server Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! HTTP service around the tabsynth engine: users upload CSV tables, generate
//! synthetic replicas with one of five strategies, and compare them against
//! the originals.
//!
//! # Overview
//!
//! - **Registry**: dataset identity, ownership and the real-table path, in SQLite
//! - **Artifact store**: real tables, synthetic tables and plots on disk
//! - **Auth**: HTTP Basic credentials checked against bcrypt hashes
//! - **Features**: CQRS slices (`commands/`, `queries/`, `routes.rs`) per resource
//!
//! CPU-bound work (synthesis, evaluation, plot rendering) runs on the blocking
//! pool behind a semaphore sized by `TABSYNTH_WORKERS`.
//!
//! # Example
//!
//! ```no_run
//! use tabsynth_server::{api, config::Config, AppContext};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let ctx = AppContext::initialize(config).await?;
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, api::create_router(ctx)).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod features;
pub mod middleware;
pub mod registry;
pub mod storage;

// Re-export commonly used types
pub use api::response::AppError;
pub use config::Config;
pub use context::AppContext;
