//! Tabsynth Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types and utilities for the tabsynth workspace.
//!
//! # Overview
//!
//! - **Table**: in-memory CSV table with header, plus missing-value rules
//! - **Layout**: naming scheme for real tables, synthetic tables and plots
//! - **Error Handling**: [`TabSynthError`] and the [`Result`] alias
//! - **Logging**: tracing subscriber bootstrap shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use tabsynth_common::{Result, Table};
//!
//! fn describe(path: &str) -> Result<()> {
//!     let table = Table::from_path(path)?;
//!     tracing::info!(columns = table.width(), rows = table.len(), "Loaded table");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod layout;
pub mod logging;
pub mod table;

// Re-export commonly used types
pub use error::{Result, TabSynthError};
pub use layout::ArtifactLayout;
pub use table::{is_missing, Table};
