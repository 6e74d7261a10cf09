//! mailvet common library
//!
//! Shared types, error handling and logging for the mailvet workspace.
//!
//! - **Types**: verification categories, per-category totals, batch status
//! - **Error Handling**: [`VerifierError`] and the [`Result`] alias
//! - **Logging**: `tracing` subscriber bootstrap driven by [`logging::LogConfig`]

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod types;

pub use error::{Result, VerifierError};
pub use types::{BatchStatus, Category, CategoryTotals, ExportCategory};
